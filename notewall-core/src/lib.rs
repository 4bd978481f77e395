pub mod config;
pub mod display;
pub mod error;
pub mod ipc;
pub mod lifecycle;
pub mod models;
pub mod moderation;
pub mod signal;
pub mod store;

pub use config::NotewallConfig;
pub use error::NotewallError;
pub use models::{DisplaySettings, Session, SessionStatus, SettingsPatch};
pub use moderation::{ModerationController, Partitions};
pub use signal::{DisplaySignal, SignalBus};
pub use store::{MemoryStore, RemoteStore, SessionStore, Subscription};
