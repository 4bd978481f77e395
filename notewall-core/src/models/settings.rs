//! Display settings stored at `displaySettings`.
//!
//! The record is last-write-wins and may be partial. Readers always merge
//! what the store holds over [`DisplaySettings::default`], top-level keys
//! shallowly and the `branding` object key by key.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::NotewallError;

pub const MIN_CARDS_PER_ROW: u8 = 2;
pub const MAX_CARDS_PER_ROW: u8 = 4;
pub const MIN_DISPLAY_DURATION_SECS: u64 = 5;
pub const MAX_DISPLAY_DURATION_SECS: u64 = 30;
pub const MIN_ZOOM_DURATION_SECS: u64 = 1;
pub const MAX_ZOOM_DURATION_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Landscape,
    Portrait,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScrollSpeed {
    Slow,
    #[default]
    Medium,
    Fast,
}

impl ScrollSpeed {
    /// Scroll advance per ~16.67 ms frame.
    pub fn pixels_per_frame(&self) -> f64 {
        match self {
            ScrollSpeed::Slow => 0.25,
            ScrollSpeed::Medium => 0.5,
            ScrollSpeed::Fast => 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FocusFrequency {
    Never,
    Rare,
    #[default]
    Normal,
    Frequent,
}

impl FocusFrequency {
    /// Multiplier over the focus base interval; `None` disables spotlighting.
    pub fn multiplier(&self) -> Option<f64> {
        match self {
            FocusFrequency::Never => None,
            FocusFrequency::Rare => Some(3.0),
            FocusFrequency::Normal => Some(1.0),
            FocusFrequency::Frequent => Some(0.5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySettings {
    pub display_mode: DisplayMode,
    /// Seconds between rotations.
    pub display_duration: u64,
    pub scroll_speed: ScrollSpeed,
    /// Seconds a spotlighted note is held.
    pub zoom_duration: u64,
    pub cards_per_row: u8,
    pub focus_frequency: FocusFrequency,
    pub branding: Branding,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::Landscape,
            display_duration: 12,
            scroll_speed: ScrollSpeed::Medium,
            zoom_duration: 8,
            cards_per_row: 3,
            focus_frequency: FocusFrequency::Normal,
            branding: Branding::default(),
        }
    }
}

impl DisplaySettings {
    /// Defaults overlaid with whatever the store snapshot holds. Fields with
    /// the wrong type are ignored individually.
    pub fn from_snapshot(snapshot: &Value) -> DisplaySettings {
        let mut settings = DisplaySettings::default();
        if snapshot.is_object() {
            match serde_json::from_value::<SettingsPatch>(snapshot.clone()) {
                Ok(patch) => patch.apply_to(&mut settings),
                Err(e) => tracing::warn!(error = %e, "Ignoring unreadable display settings"),
            }
        }
        settings
    }

    /// Cards per row clamped to the supported grid widths.
    pub fn grid_columns(&self) -> usize {
        self.cards_per_row.clamp(MIN_CARDS_PER_ROW, MAX_CARDS_PER_ROW) as usize
    }

    /// Rotation period. Records written around validation are clamped
    /// into range here.
    pub fn rotation_period(&self) -> Duration {
        Duration::from_secs(
            self.display_duration
                .clamp(MIN_DISPLAY_DURATION_SECS, MAX_DISPLAY_DURATION_SECS),
        )
    }

    pub fn zoom_hold(&self) -> Duration {
        Duration::from_secs(self.zoom_duration.clamp(MIN_ZOOM_DURATION_SECS, MAX_ZOOM_DURATION_SECS))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branding {
    pub background_type: String,
    pub background_color: String,
    pub gradient_start: String,
    pub gradient_end: String,
    pub gradient_angle: u16,
    pub background_image: String,
    pub header_color_start: String,
    pub header_color_end: String,
    pub header_gradient_angle: u16,
    pub header_font: String,
    pub header_padding: String,
    pub header_font_size: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            background_type: "gradient".to_string(),
            background_color: "#f0f0f0".to_string(),
            gradient_start: "#faf5ff".to_string(),
            gradient_end: "#fce7f3".to_string(),
            gradient_angle: 135,
            background_image: String::new(),
            header_color_start: "#a855f7".to_string(),
            header_color_end: "#ec4899".to_string(),
            header_gradient_angle: 90,
            header_font: "system-ui".to_string(),
            header_padding: "normal".to_string(),
            header_font_size: "native".to_string(),
        }
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Partial settings update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub display_mode: Option<DisplayMode>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub display_duration: Option<u64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub scroll_speed: Option<ScrollSpeed>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub zoom_duration: Option<u64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub cards_per_row: Option<u8>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub focus_frequency: Option<FocusFrequency>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub branding: Option<BrandingPatch>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandingPatch {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub background_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub gradient_start: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub gradient_end: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub gradient_angle: Option<u16>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub header_color_start: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub header_color_end: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub header_gradient_angle: Option<u16>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub header_font: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub header_padding: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub header_font_size: Option<String>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }

    /// Reject values the display cannot honour.
    pub fn validate(&self) -> Result<(), NotewallError> {
        if let Some(cards) = self.cards_per_row {
            if !(MIN_CARDS_PER_ROW..=MAX_CARDS_PER_ROW).contains(&cards) {
                return Err(NotewallError::Validation(format!(
                    "cardsPerRow must be between {} and {}, got {}",
                    MIN_CARDS_PER_ROW, MAX_CARDS_PER_ROW, cards
                )));
            }
        }
        if let Some(duration) = self.display_duration {
            if !(MIN_DISPLAY_DURATION_SECS..=MAX_DISPLAY_DURATION_SECS).contains(&duration) {
                return Err(NotewallError::Validation(format!(
                    "displayDuration must be between {} and {} seconds, got {}",
                    MIN_DISPLAY_DURATION_SECS, MAX_DISPLAY_DURATION_SECS, duration
                )));
            }
        }
        if let Some(duration) = self.zoom_duration {
            if !(MIN_ZOOM_DURATION_SECS..=MAX_ZOOM_DURATION_SECS).contains(&duration) {
                return Err(NotewallError::Validation(format!(
                    "zoomDuration must be between {} and {} seconds, got {}",
                    MIN_ZOOM_DURATION_SECS, MAX_ZOOM_DURATION_SECS, duration
                )));
            }
        }
        Ok(())
    }

    pub fn apply_to(&self, settings: &mut DisplaySettings) {
        if let Some(v) = self.display_mode {
            settings.display_mode = v;
        }
        if let Some(v) = self.display_duration {
            settings.display_duration = v;
        }
        if let Some(v) = self.scroll_speed {
            settings.scroll_speed = v;
        }
        if let Some(v) = self.zoom_duration {
            settings.zoom_duration = v;
        }
        if let Some(v) = self.cards_per_row {
            settings.cards_per_row = v;
        }
        if let Some(v) = self.focus_frequency {
            settings.focus_frequency = v;
        }
        if let Some(branding) = &self.branding {
            branding.apply_to(&mut settings.branding);
        }
    }

    /// Fields for a store `patch` at `displaySettings`, branding excluded.
    pub fn top_level_fields(&self) -> Map<String, Value> {
        let mut fields = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        fields.remove("branding");
        fields
    }

    /// Fields for a store `patch` at `displaySettings/branding`.
    pub fn branding_fields(&self) -> Option<Map<String, Value>> {
        let branding = self.branding.as_ref()?;
        match serde_json::to_value(branding) {
            Ok(Value::Object(map)) if !map.is_empty() => Some(map),
            _ => None,
        }
    }
}

impl BrandingPatch {
    pub fn apply_to(&self, branding: &mut Branding) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(v) = &self.$field { branding.$field = v.clone(); })*
            };
        }
        merge!(
            background_type,
            background_color,
            gradient_start,
            gradient_end,
            gradient_angle,
            background_image,
            header_color_start,
            header_color_end,
            header_gradient_angle,
            header_font,
            header_padding,
            header_font_size
        );
    }
}
