use chrono::Utc;
use notewall_core::models::{CaptureInput, Session, SessionStatus, TemplateTheme};
use notewall_core::store::{session_path, SessionStore};
use notewall_core::NotewallError;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("Missing '{0}'")]
    MissingField(&'static str),

    #[error("Store write failed: {0}")]
    Store(#[from] NotewallError),

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// What the tablet sends for one note.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub drawing_image: String,
    #[serde(default)]
    pub template_theme: Option<String>,
    #[serde(default)]
    pub raw_drawing_data: Option<String>,
}

impl Submission {
    fn validate(&self) -> Result<(), SubmissionError> {
        if self.recipient.trim().is_empty() {
            return Err(SubmissionError::MissingField("recipient"));
        }
        if self.sender.trim().is_empty() {
            return Err(SubmissionError::MissingField("sender"));
        }
        if self.drawing_image.trim().is_empty() {
            return Err(SubmissionError::MissingField("drawingImage"));
        }
        Ok(())
    }

    /// Known themes are stored by canonical name; anything else verbatim.
    fn theme(&self) -> String {
        match self.template_theme.as_deref().map(str::trim) {
            None | Some("") => TemplateTheme::Blank.as_str().to_string(),
            Some(raw) => TemplateTheme::parse(raw)
                .map(|t| t.as_str().to_string())
                .unwrap_or_else(|| raw.to_string()),
        }
    }

    pub fn into_session(self, session_id: String, now_ms: i64, ttl_secs: u64) -> Session {
        let template_theme = self.theme();
        Session {
            session_id,
            status: SessionStatus::Pending,
            created_at: now_ms,
            displayed_at: None,
            expires_at: now_ms + (ttl_secs as i64) * 1000,
            input: CaptureInput {
                recipient: self.recipient.trim().to_string(),
                sender: self.sender.trim().to_string(),
                drawing_image: self.drawing_image,
                template_theme,
                raw_drawing_data: self.raw_drawing_data,
            },
        }
    }
}

/// Validate and write a new pending session. Returns the stored record.
pub async fn submit(
    store: &dyn SessionStore,
    submission: Submission,
    ttl_secs: u64,
) -> Result<Session, SubmissionError> {
    submission.validate()?;

    let session_id = Uuid::new_v4().to_string();
    let session = submission.into_session(session_id, Utc::now().timestamp_millis(), ttl_secs);
    let record = serde_json::to_value(&session)?;
    store.write(&session_path(&session.session_id), record).await?;

    tracing::info!(
        session_id = %session.session_id,
        theme = %session.input.template_theme,
        "Captured new note"
    );
    Ok(session)
}
