//! Moderation controller
//!
//! Keeps a local view of every session, partitioned by status, plus the
//! merged display settings and store connectivity. Operator actions resolve
//! against that view and go to the store as unconditional writes; the view
//! itself only changes when the store echoes the write back.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, watch};

use crate::config::ModerationConfig;
use crate::error::{NotewallError, Result};
use crate::lifecycle::{self, Transition};
use crate::models::{decode_sessions, DisplaySettings, Session, SessionStatus, SettingsPatch};
use crate::signal::{DisplaySignal, SignalBus};
use crate::store::{self, SessionStore, BRANDING_PATH, SESSIONS_PATH, SETTINGS_PATH};

// ============================================================================
// Partitions and stats
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Pending,
    Live,
    Rejected,
    Complete,
}

impl Partition {
    pub fn contains(&self, status: SessionStatus) -> bool {
        match self {
            Partition::Pending => status == SessionStatus::Pending,
            Partition::Live => status.is_live(),
            Partition::Rejected => status == SessionStatus::Rejected,
            Partition::Complete => status == SessionStatus::Complete,
        }
    }
}

impl FromStr for Partition {
    type Err = NotewallError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Partition::Pending),
            "live" => Ok(Partition::Live),
            "rejected" => Ok(Partition::Rejected),
            "complete" => Ok(Partition::Complete),
            other => Err(NotewallError::Validation(format!("unknown partition: {}", other))),
        }
    }
}

/// Sessions grouped by status, each group newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Partitions {
    pub pending: Vec<Session>,
    pub live: Vec<Session>,
    pub rejected: Vec<Session>,
    pub complete: Vec<Session>,
}

impl Partitions {
    /// `sessions` must already be newest first.
    pub fn from_sessions(sessions: &[Session]) -> Self {
        let mut partitions = Partitions::default();
        for session in sessions {
            let bucket = match session.status {
                SessionStatus::Pending => &mut partitions.pending,
                SessionStatus::ReadyForDisplay | SessionStatus::Displaying => &mut partitions.live,
                SessionStatus::Rejected => &mut partitions.rejected,
                SessionStatus::Complete => &mut partitions.complete,
            };
            bucket.push(session.clone());
        }
        partitions
    }

    pub fn get(&self, partition: Partition) -> &[Session] {
        match partition {
            Partition::Pending => &self.pending,
            Partition::Live => &self.live,
            Partition::Rejected => &self.rejected,
            Partition::Complete => &self.complete,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationStats {
    pub total: usize,
    pub displayed_today: usize,
    pub pending: usize,
    pub live: usize,
    pub rejected: usize,
    pub complete: usize,
}

/// Counts as of `now`. "Displayed today" means complete and created on
/// `now`'s calendar day.
pub fn compute_stats<Tz: TimeZone>(sessions: &[Session], now: &DateTime<Tz>) -> ModerationStats {
    let today = now.date_naive();
    let tz = now.timezone();
    let mut stats = ModerationStats {
        total: sessions.len(),
        ..ModerationStats::default()
    };
    for session in sessions {
        match session.status {
            SessionStatus::Pending => stats.pending += 1,
            SessionStatus::ReadyForDisplay | SessionStatus::Displaying => stats.live += 1,
            SessionStatus::Rejected => stats.rejected += 1,
            SessionStatus::Complete => {
                stats.complete += 1;
                let created = tz.timestamp_millis_opt(session.created_at).single();
                if created.map(|c| c.date_naive()) == Some(today) {
                    stats.displayed_today += 1;
                }
            }
        }
    }
    stats
}

// ============================================================================
// View state
// ============================================================================

#[derive(Debug, Clone)]
pub enum ModerationEvent {
    Sessions(Value),
    Settings(Value),
    Connectivity(bool),
}

#[derive(Debug, Clone, Default)]
pub struct ModerationView {
    pub sessions: Vec<Session>,
    pub partitions: Partitions,
    pub settings: DisplaySettings,
    pub connected: bool,
    /// Set once the first sessions snapshot has arrived.
    pub loaded: bool,
}

impl ModerationView {
    pub fn apply(&mut self, event: ModerationEvent) {
        match event {
            ModerationEvent::Sessions(snapshot) => {
                self.sessions = decode_sessions(&snapshot);
                self.partitions = Partitions::from_sessions(&self.sessions);
                self.loaded = true;
            }
            ModerationEvent::Settings(snapshot) => {
                self.settings = DisplaySettings::from_snapshot(&snapshot);
            }
            ModerationEvent::Connectivity(connected) => {
                self.connected = connected;
            }
        }
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.session_id == id)
    }
}

// ============================================================================
// Controller
// ============================================================================

#[derive(Clone)]
pub struct ModerationController {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn SessionStore>,
    signals: SignalBus,
    config: ModerationConfig,
    view: watch::Sender<ModerationView>,
}

fn confirm(expected: &str, given: &str) -> Result<()> {
    if given.trim() == expected {
        Ok(())
    } else {
        Err(NotewallError::ConfirmationMismatch {
            expected: expected.to_string(),
        })
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl ModerationController {
    pub fn new(store: Arc<dyn SessionStore>, signals: SignalBus, config: ModerationConfig) -> Self {
        let (view, _) = watch::channel(ModerationView::default());
        Self {
            inner: Arc::new(Inner {
                store,
                signals,
                config,
                view,
            }),
        }
    }

    /// Follow the store until shutdown.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let mut sessions = self.inner.store.subscribe(SESSIONS_PATH).await?;
        let mut settings = self.inner.store.subscribe(SETTINGS_PATH).await?;
        let mut connectivity = self.inner.store.connectivity();
        let connected = *connectivity.borrow_and_update();
        self.apply(ModerationEvent::Connectivity(connected));

        tracing::info!("Moderation view following the store");

        loop {
            tokio::select! {
                Some(snapshot) = sessions.next() => {
                    self.apply(ModerationEvent::Sessions(snapshot));
                    let stats = self.stats();
                    tracing::debug!(
                        pending = stats.pending,
                        live = stats.live,
                        rejected = stats.rejected,
                        "Sessions updated"
                    );
                }
                Some(snapshot) = settings.next() => {
                    self.apply(ModerationEvent::Settings(snapshot));
                }
                changed = connectivity.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let connected = *connectivity.borrow_and_update();
                    if connected {
                        tracing::info!("Store connection restored");
                    } else {
                        tracing::warn!("Store connection lost");
                    }
                    self.apply(ModerationEvent::Connectivity(connected));
                }
                _ = shutdown.recv() => {
                    tracing::info!("Moderation loop shutting down");
                    break;
                }
                else => break,
            }
        }
        Ok(())
    }

    /// One-shot read of both records into the view.
    pub async fn refresh(&self) -> Result<()> {
        let sessions = self.inner.store.get(SESSIONS_PATH).await?;
        let settings = self.inner.store.get(SETTINGS_PATH).await?;
        let connected = *self.inner.store.connectivity().borrow();
        self.apply(ModerationEvent::Sessions(sessions));
        self.apply(ModerationEvent::Settings(settings));
        self.apply(ModerationEvent::Connectivity(connected));
        Ok(())
    }

    pub fn apply(&self, event: ModerationEvent) {
        self.inner.view.send_modify(|view| view.apply(event));
    }

    /// Watch the view change.
    pub fn watch(&self) -> watch::Receiver<ModerationView> {
        self.inner.view.subscribe()
    }

    pub fn partitions(&self) -> Partitions {
        self.inner.view.borrow().partitions.clone()
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.inner.view.borrow().sessions.clone()
    }

    pub fn session(&self, id: &str) -> Option<Session> {
        self.inner.view.borrow().session(id).cloned()
    }

    pub fn settings(&self) -> DisplaySettings {
        self.inner.view.borrow().settings.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.view.borrow().connected
    }

    pub fn stats(&self) -> ModerationStats {
        compute_stats(&self.inner.view.borrow().sessions, &Local::now())
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.inner.config
    }

    pub async fn approve(&self, id: &str) -> Result<bool> {
        self.transition(Transition::Approve, id).await
    }

    pub async fn reject(&self, id: &str) -> Result<bool> {
        self.transition(Transition::Reject, id).await
    }

    /// No-op (`Ok(false)`) unless the session is rejected.
    pub async fn restore(&self, id: &str) -> Result<bool> {
        self.transition(Transition::Restore, id).await
    }

    pub async fn mark_complete(&self, id: &str) -> Result<bool> {
        self.transition(Transition::MarkComplete, id).await
    }

    async fn transition(&self, transition: Transition, id: &str) -> Result<bool> {
        let current = self
            .session(id)
            .ok_or_else(|| NotewallError::NotFound(format!("session {}", id)))?;

        let Some(write) = lifecycle::plan(transition, Some(&current), now_ms()) else {
            tracing::debug!(session_id = %id, action = transition.name(), status = %current.status, "Transition skipped");
            return Ok(false);
        };

        lifecycle::apply(self.inner.store.as_ref(), &write).await?;
        tracing::info!(
            session_id = %id,
            action = transition.name(),
            from = %current.status,
            to = %write.status,
            "Session transitioned"
        );
        Ok(true)
    }

    /// Remove one session for good. `confirmation` must be the delete phrase.
    pub async fn delete_forever(&self, id: &str, confirmation: &str) -> Result<()> {
        confirm(&self.inner.config.delete_phrase, confirmation)?;
        store::validate_key(id)?;
        if self.session(id).is_none() {
            return Err(NotewallError::NotFound(format!("session {}", id)));
        }
        self.inner.store.delete(&store::session_path(id)).await?;
        tracing::warn!(session_id = %id, "Session deleted permanently");
        Ok(())
    }

    /// Remove every session. Returns how many the local view held.
    pub async fn clear_all(&self, confirmation: &str) -> Result<usize> {
        confirm(&self.inner.config.clear_all_phrase, confirmation)?;
        let count = self.inner.view.borrow().sessions.len();
        self.inner.store.delete(SESSIONS_PATH).await?;
        tracing::warn!(count, "All sessions deleted");
        Ok(count)
    }

    /// Tell every listening display to restart. Returns how many listeners
    /// received it; zero is not an error.
    pub fn reset_slideshow(&self, confirmation: &str) -> Result<usize> {
        confirm(&self.inner.config.reset_phrase, confirmation)?;
        let receivers = self.inner.signals.publish(DisplaySignal::ResetSlideshow);
        tracing::info!(receivers, "Slideshow reset sent");
        Ok(receivers)
    }

    /// Merge a partial update into the stored settings. Returns the settings
    /// the view will hold once the store echoes the write.
    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<DisplaySettings> {
        patch.validate()?;

        let top = patch.top_level_fields();
        if !top.is_empty() {
            self.inner.store.patch(SETTINGS_PATH, top).await?;
        }
        if let Some(branding) = patch.branding_fields() {
            self.inner.store.patch(BRANDING_PATH, branding).await?;
        }

        let mut expected = self.settings();
        patch.apply_to(&mut expected);
        tracing::info!(?patch, "Display settings updated");
        Ok(expected)
    }
}
