pub mod session;
pub mod settings;

pub use session::{decode_sessions, CaptureInput, Session, SessionStatus, TemplateTheme};
pub use settings::{
    Branding, BrandingPatch, DisplayMode, DisplaySettings, FocusFrequency, ScrollSpeed,
    SettingsPatch,
};
