use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::dispatcher::DEFAULT_QUEUE_CAPACITY;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Address of the shade gateway.  Required.
    pub gateway_ip: String,
    pub gateway_port: u16,
    /// How long shade data may be served from memory, in seconds.
    pub cache_ttl_secs: u64,
    pub workers: usize,
    pub queue_capacity: usize,
    /// Debug-level logging.
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway_ip: String::new(),
            gateway_port: 522,
            cache_ttl_secs: 10,
            workers: 1,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            verbose: false,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Toml::file("shadegate.toml"))
                .merge(Json::file("shadegate.json"))
                .merge(Env::prefixed("SHADEGATE_")),
        )
    }

    fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config: Config = figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.gateway_ip.trim().is_empty() {
            anyhow::bail!("IP address is required");
        }
        self.parsed_ip()?;
        if self.workers == 0 {
            anyhow::bail!("At least one worker is required");
        }
        if self.queue_capacity == 0 {
            anyhow::bail!("Queue capacity must be at least 1");
        }
        Ok(())
    }

    pub fn gateway_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(SocketAddr::new(self.parsed_ip()?, self.gateway_port))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    fn parsed_ip(&self) -> anyhow::Result<IpAddr> {
        self.gateway_ip
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid IP address: {}", self.gateway_ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_reference_setup() {
        let config = Config::default();
        assert_eq!(config.gateway_port, 522);
        assert_eq!(config.cache_ttl(), Duration::from_secs(10));
        assert_eq!(config.workers, 1);
        assert_eq!(config.queue_capacity, 100);
        assert!(!config.verbose);
    }

    #[test]
    fn missing_or_bad_ip_is_rejected() {
        let mut config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("IP address is required"));

        config.gateway_ip = "not-an-ip".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid IP address"));

        config.gateway_ip = "10.0.0.5".into();
        config.validate().unwrap();
        assert_eq!(
            config.gateway_addr().unwrap(),
            "10.0.0.5:522".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn zero_workers_or_capacity_is_rejected() {
        let config = Config {
            gateway_ip: "10.0.0.5".into(),
            workers: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            gateway_ip: "10.0.0.5".into(),
            queue_capacity: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn file_and_env_layers_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "shadegate.toml",
                r#"
                gateway_ip = "192.168.1.20"
                cache_ttl_secs = 30
                "#,
            )?;
            jail.set_env("SHADEGATE_WORKERS", "3");
            jail.set_env("SHADEGATE_CACHE_TTL_SECS", "5");

            let config = Config::load().map_err(|e| e.to_string())?;
            assert_eq!(config.gateway_ip, "192.168.1.20");
            assert_eq!(config.workers, 3);
            assert_eq!(config.cache_ttl(), Duration::from_secs(5));
            assert_eq!(config.gateway_port, 522);
            Ok(())
        });
    }

    #[test]
    fn load_fails_without_gateway_ip() {
        Jail::expect_with(|_jail| {
            let err = Config::load().unwrap_err();
            assert!(err.to_string().contains("IP address is required"));
            Ok(())
        });
    }
}
