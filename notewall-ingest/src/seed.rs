use chrono::Utc;
use notewall_core::models::{CaptureInput, Session, SessionStatus};
use notewall_core::store::{session_path, SessionStore};
use notewall_core::NotewallError;

/// 10x10 solid PNG, base64.
pub const DEMO_IMAGE: &str = "iVBORw0KGgoAAAANSUhEUgAAAAoAAAAKCAYAAACNMs+9AAAAFUlEQVR42mP8z8BQz0AEYBxVSF+FABJADveWkH6oAAAAAElFTkSuQmCC";

const DEMO_NOTES: [(&str, &str, &str); 5] = [
    ("Sarah Johnson", "Mike Chen", "watercolor"),
    ("The Amazing Team", "Emily Rodriguez", "heart_border"),
    ("Dr. Smith", "John Williams", "confetti"),
    ("Mom & Dad", "Jennifer Lee", "floral"),
    ("Best Friend Emma", "Alex Thompson", "sticky_note"),
];

const SPACING_MS: i64 = 60_000;

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub count: usize,
    /// Skip moderation and seed straight into the live set.
    pub live: bool,
    pub ttl_secs: u64,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            count: DEMO_NOTES.len(),
            live: false,
            ttl_secs: 3600,
        }
    }
}

/// Build demo sessions, newest first, one minute apart ending at `now_ms`.
pub fn demo_sessions(options: &SeedOptions, now_ms: i64) -> Vec<Session> {
    let status = if options.live {
        SessionStatus::ReadyForDisplay
    } else {
        SessionStatus::Pending
    };

    (0..options.count)
        .map(|i| {
            let (recipient, sender, theme) = DEMO_NOTES[i % DEMO_NOTES.len()];
            let created_at = now_ms - i as i64 * SPACING_MS;
            Session {
                session_id: format!("test-{}-{}", now_ms, i),
                status,
                created_at,
                displayed_at: None,
                expires_at: created_at + options.ttl_secs as i64 * 1000,
                input: CaptureInput {
                    recipient: recipient.to_string(),
                    sender: sender.to_string(),
                    drawing_image: DEMO_IMAGE.to_string(),
                    template_theme: theme.to_string(),
                    raw_drawing_data: None,
                },
            }
        })
        .collect()
}

/// Write demo notes into the store. Returns their ids.
pub async fn seed_demo_notes(
    store: &dyn SessionStore,
    options: &SeedOptions,
) -> Result<Vec<String>, NotewallError> {
    let sessions = demo_sessions(options, Utc::now().timestamp_millis());
    let mut ids = Vec::with_capacity(sessions.len());
    for session in sessions {
        let path = session_path(&session.session_id);
        store.write(&path, serde_json::to_value(&session)?).await?;
        tracing::info!(
            session_id = %session.session_id,
            "Seeded note from {} to {}",
            session.input.sender,
            session.input.recipient
        );
        ids.push(session.session_id);
    }
    Ok(ids)
}
