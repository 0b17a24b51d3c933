use std::io::Write;

use env_logger::Env;
use log::LevelFilter;

/// Install the process logger.  `RUST_LOG` still wins over `verbose`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(verbose: bool) {
    let _ = builder(verbose).try_init();
}

fn builder(verbose: bool) -> env_logger::Builder {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(
        format!("{}={}", env!("CARGO_CRATE_NAME"), level(verbose)),
    ));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} {}:{} ▶ {} {}",
            buf.timestamp_millis(),
            record.file().unwrap_or("?"),
            record.line().unwrap_or(0),
            record.level(),
            record.args()
        )
    });
    builder
}

fn level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_selects_debug() {
        assert_eq!(level(true), LevelFilter::Debug);
        assert_eq!(level(false), LevelFilter::Info);
    }

    #[test]
    fn init_twice_does_not_panic() {
        init(false);
        init(true);
    }
}
