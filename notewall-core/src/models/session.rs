use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Placeholder caption for records whose capture payload is missing.
pub const UNKNOWN_CAPTION: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    ReadyForDisplay,
    Displaying,
    Complete,
    Rejected,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::ReadyForDisplay => "ready_for_display",
            SessionStatus::Displaying => "displaying",
            SessionStatus::Complete => "complete",
            SessionStatus::Rejected => "rejected",
        }
    }

    /// Candidates for the public display.
    pub fn is_live(&self) -> bool {
        matches!(self, SessionStatus::ReadyForDisplay | SessionStatus::Displaying)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One submitted note as stored under `sessions/<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub session_id: String,
    pub status: SessionStatus,
    #[serde(deserialize_with = "epoch_millis")]
    pub created_at: i64,
    #[serde(default, deserialize_with = "optional_epoch_millis")]
    pub displayed_at: Option<i64>,
    #[serde(default, deserialize_with = "epoch_millis")]
    pub expires_at: i64,
    #[serde(rename = "iPad_input", default)]
    pub input: CaptureInput,
}

/// Capture payload written by the tablet. The drawing is opaque here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureInput {
    #[serde(default = "unknown_caption")]
    pub recipient: String,
    #[serde(default = "unknown_caption")]
    pub sender: String,
    #[serde(default)]
    pub drawing_image: String,
    #[serde(default = "default_theme")]
    pub template_theme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_drawing_data: Option<String>,
}

impl Default for CaptureInput {
    fn default() -> Self {
        Self {
            recipient: unknown_caption(),
            sender: unknown_caption(),
            drawing_image: String::new(),
            template_theme: default_theme(),
            raw_drawing_data: None,
        }
    }
}

fn unknown_caption() -> String {
    UNKNOWN_CAPTION.to_string()
}

fn default_theme() -> String {
    TemplateTheme::Blank.as_str().to_string()
}

// Timestamps arrive as integers from most writers but as floats from some.
fn epoch_millis<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_epoch_millis(deserializer)?.unwrap_or(0))
}

fn optional_epoch_millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))))
}

impl Session {
    /// Decode one entry of the `sessions` collection. The store key is the
    /// authoritative id; a missing `sessionId` field falls back to it.
    /// Returns `None` for entries that cannot be interpreted at all.
    pub fn from_entry(key: &str, value: &Value) -> Option<Session> {
        match serde_json::from_value::<Session>(value.clone()) {
            Ok(mut session) => {
                if session.session_id != key {
                    session.session_id = key.to_string();
                }
                Some(session)
            }
            Err(e) => {
                tracing::warn!(session_id = %key, error = %e, "Skipping malformed session record");
                None
            }
        }
    }

    pub fn id(&self) -> &str {
        &self.session_id
    }

    pub fn recipient(&self) -> &str {
        caption_or_unknown(&self.input.recipient)
    }

    pub fn sender(&self) -> &str {
        caption_or_unknown(&self.input.sender)
    }
}

fn caption_or_unknown(s: &str) -> &str {
    if s.trim().is_empty() {
        UNKNOWN_CAPTION
    } else {
        s
    }
}

/// Decode the whole `sessions` snapshot, newest first. `null` (no sessions)
/// decodes to an empty list.
pub fn decode_sessions(snapshot: &Value) -> Vec<Session> {
    let mut sessions: Vec<Session> = match snapshot.as_object() {
        Some(map) => map
            .iter()
            .filter_map(|(key, value)| Session::from_entry(key, value))
            .collect(),
        None => Vec::new(),
    };
    sort_newest_first(&mut sessions);
    sessions
}

pub fn sort_newest_first(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.session_id.cmp(&b.session_id))
    });
}

/// Card templates offered on the tablet. Rendering only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateTheme {
    Blank,
    #[serde(alias = "stickyNote")]
    StickyNote,
    Watercolor,
    Confetti,
    #[serde(alias = "heartBorder")]
    HeartBorder,
    Minimalist,
    Gradient,
    Floral,
}

impl TemplateTheme {
    pub const ALL: [TemplateTheme; 8] = [
        TemplateTheme::Blank,
        TemplateTheme::StickyNote,
        TemplateTheme::Watercolor,
        TemplateTheme::Confetti,
        TemplateTheme::HeartBorder,
        TemplateTheme::Minimalist,
        TemplateTheme::Gradient,
        TemplateTheme::Floral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateTheme::Blank => "blank",
            TemplateTheme::StickyNote => "sticky_note",
            TemplateTheme::Watercolor => "watercolor",
            TemplateTheme::Confetti => "confetti",
            TemplateTheme::HeartBorder => "heart_border",
            TemplateTheme::Minimalist => "minimalist",
            TemplateTheme::Gradient => "gradient",
            TemplateTheme::Floral => "floral",
        }
    }

    /// Accepts both the snake_case identifiers and the camelCase spellings
    /// older clients wrote.
    pub fn parse(s: &str) -> Option<TemplateTheme> {
        serde_json::from_value(Value::String(s.to_string())).ok()
    }
}
