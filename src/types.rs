//! Data structures shared by the cache, the directory and the dispatcher.
//!
//! The gateway reports shade positions on its own native scale
//! (`0..=MAX_SHADE_HEIGHT`), while everything handed to callers is a
//! percentage.  The two conversions below are each other's inverse for
//! every percentage in `0..=100`.

use serde::{Deserialize, Serialize};

/// Highest position on the gateway's native height scale.
pub const MAX_SHADE_HEIGHT: u8 = 255;

/// A window shade as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shade {
    pub id: String,
    pub name: String,
    pub room_id: String,
    /// Position on the native scale.
    pub height: u8,
}

impl Shade {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        room_id: impl Into<String>,
        height: u8,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            room_id: room_id.into(),
            height,
        }
    }
}

/// What callers see of a shade: the height is a percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadeView {
    pub id: String,
    pub name: String,
    pub room_id: String,
    #[serde(rename = "height")]
    pub height_percent: u8,
}

impl From<&Shade> for ShadeView {
    fn from(shade: &Shade) -> Self {
        Self {
            id: shade.id.clone(),
            name: shade.name.clone(),
            room_id: shade.room_id.clone(),
            height_percent: native_to_percent(shade.height),
        }
    }
}

/// A pending height change, already converted to the native scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub target_id: String,
    pub desired_height: u8,
}

impl UpdateRequest {
    /// Builds a request from a percentage, clamping anything above 100.
    pub fn from_percent(target_id: impl Into<String>, percent: u8) -> Self {
        Self {
            target_id: target_id.into(),
            desired_height: percent_to_native(percent),
        }
    }
}

/// Native height to percentage, rounding half up.
pub fn native_to_percent(native: u8) -> u8 {
    let max = u32::from(MAX_SHADE_HEIGHT);
    // round(native * 100 / max) == floor((native * 200 + max) / (2 * max))
    ((u32::from(native) * 200 + max) / (2 * max)) as u8
}

/// Percentage to native height using `+0.5` truncation.
pub fn percent_to_native(percent: u8) -> u8 {
    let percent = percent.min(100);
    (f64::from(percent) / 100.0 * f64::from(MAX_SHADE_HEIGHT) + 0.5) as u8
}
