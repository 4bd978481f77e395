//! Session state machine
//!
//! ```text
//! pending ──approve──▶ ready_for_display ──pickup──▶ displaying ──▶ complete
//!    │                        │                          │
//!    └──reject──▶ rejected ◀──┴──────────reject──────────┘
//!                    │
//!                    └──restore──▶ pending
//! ```
//!
//! Writes are unconditional overwrites of `status`; the guards are that the
//! record exists and that it is not `complete`, which is terminal. `restore`
//! is a no-op unless the record is `rejected`. `displayedAt` is stamped once, through a
//! create-only write, so a second pickup never moves it.

use serde_json::{json, Map, Value};

use crate::models::{Session, SessionStatus};
use crate::store::{self, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Approve,
    Reject,
    Restore,
    MarkDisplaying,
    MarkComplete,
}

impl Transition {
    pub fn target(&self) -> SessionStatus {
        match self {
            Transition::Approve => SessionStatus::ReadyForDisplay,
            Transition::Reject => SessionStatus::Rejected,
            Transition::Restore => SessionStatus::Pending,
            Transition::MarkDisplaying => SessionStatus::Displaying,
            Transition::MarkComplete => SessionStatus::Complete,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transition::Approve => "approve",
            Transition::Reject => "reject",
            Transition::Restore => "restore",
            Transition::MarkDisplaying => "mark_displaying",
            Transition::MarkComplete => "mark_complete",
        }
    }
}

/// Edges of the state machine. Re-entering the current state is always
/// allowed since writes are idempotent overwrites.
pub fn can_transition(from: SessionStatus, to: SessionStatus) -> bool {
    use SessionStatus::*;
    if from == to {
        return from != Complete;
    }
    matches!(
        (from, to),
        (Pending, ReadyForDisplay)
            | (Pending, Rejected)
            | (Pending, Displaying)
            | (ReadyForDisplay, Displaying)
            | (ReadyForDisplay, Rejected)
            | (Displaying, Rejected)
            | (Displaying, Complete)
            | (Rejected, Pending)
    )
}

/// The store mutation a transition resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusWrite {
    pub session_id: String,
    pub status: SessionStatus,
    /// Set only on the first entry into `displaying`.
    pub stamp_displayed_at: Option<i64>,
}

impl StatusWrite {
    pub fn fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!(self.status.as_str()));
        fields
    }
}

/// Resolve a transition against the writer's current view of the record.
/// `None` means nothing should be written.
pub fn plan(transition: Transition, current: Option<&Session>, now_ms: i64) -> Option<StatusWrite> {
    let session = current?;
    let from = session.status;
    let to = transition.target();
    if from == SessionStatus::Complete {
        return None;
    }

    match transition {
        // Operator actions overwrite unconditionally.
        Transition::Approve | Transition::Reject => {}
        Transition::Restore => {
            if from != SessionStatus::Rejected {
                return None;
            }
        }
        Transition::MarkDisplaying => {
            if !can_transition(from, to) {
                return None;
            }
            if from == SessionStatus::Displaying && session.displayed_at.is_some() {
                return None;
            }
        }
        Transition::MarkComplete => {
            if from != SessionStatus::Displaying {
                return None;
            }
        }
    }

    let stamp_displayed_at = if to == SessionStatus::Displaying && session.displayed_at.is_none() {
        Some(now_ms)
    } else {
        None
    };

    Some(StatusWrite {
        session_id: session.session_id.clone(),
        status: to,
        stamp_displayed_at,
    })
}

/// Issue a planned write against the store. A record deleted since the
/// plan was made is left deleted.
pub async fn apply(store: &dyn SessionStore, write: &StatusWrite) -> crate::error::Result<()> {
    let path = store::session_path(&write.session_id);
    if store.get(&path).await?.is_null() {
        tracing::debug!(session = %write.session_id, "Session gone, skipping status write");
        return Ok(());
    }
    store.patch(&path, write.fields()).await?;
    if let Some(ts) = write.stamp_displayed_at {
        let stamp_path = format!("{}/displayedAt", path);
        store.write_if_absent(&stamp_path, json!(ts)).await?;
    }
    Ok(())
}
