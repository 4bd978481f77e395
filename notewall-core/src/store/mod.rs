//! Session Store contract
//!
//! A synchronized, subscribable JSON tree. Two implementations:
//! - [`MemoryStore`] - the authoritative tree, hosted by `notewall-server`
//! - [`RemoteStore`] - an IPC client of that host, used by display processes
//!
//! All filtering happens client-side on full snapshots; the store offers no
//! queries and no compare-and-set beyond the create-only
//! [`SessionStore::write_if_absent`] used for one-time timestamps.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::error::{NotewallError, Result};

pub mod memory;
pub mod remote;
pub mod tree;

pub use memory::MemoryStore;
pub use remote::RemoteStore;

pub const SESSIONS_PATH: &str = "sessions";
pub const SETTINGS_PATH: &str = "displaySettings";
pub const BRANDING_PATH: &str = "displaySettings/branding";

pub fn session_path(id: &str) -> String {
    format!("{}/{}", SESSIONS_PATH, id)
}

/// Session ids become path segments; reject anything that would escape one.
pub fn validate_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key
            .chars()
            .any(|c| matches!(c, '/' | '.' | '#' | '$' | '[' | ']') || c.is_control());
    if bad {
        return Err(NotewallError::Validation(format!("invalid key: {:?}", key)));
    }
    Ok(())
}

fn validate_mutation_path(path: &str) -> Result<()> {
    if tree::segments(path).is_empty() {
        return Err(NotewallError::Validation(
            "refusing to mutate the store root".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stream of full-value snapshots at `path`: the current value first,
    /// then one per actual change. Absent values are `Value::Null`.
    async fn subscribe(&self, path: &str) -> Result<Subscription>;

    /// Live connectivity to the store.
    fn connectivity(&self) -> watch::Receiver<bool>;

    /// Full overwrite of the subtree at `path`.
    async fn write(&self, path: &str, value: Value) -> Result<()>;

    /// Merge top-level `fields` into the subtree at `path`.
    async fn patch(&self, path: &str, fields: Map<String, Value>) -> Result<()>;

    /// Remove the subtree at `path`.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Write only if nothing is stored at `path`. Returns whether it wrote.
    async fn write_if_absent(&self, path: &str, value: Value) -> Result<bool>;

    /// One-shot read.
    async fn get(&self, path: &str) -> Result<Value> {
        let mut subscription = self.subscribe(path).await?;
        subscription.next().await.ok_or(NotewallError::Disconnected)
    }
}

enum Source {
    /// Projection of a whole tree.
    Tree {
        rx: watch::Receiver<Value>,
        path: String,
    },
    /// Values pushed for one path; `None` until the first push arrives.
    Pushed { rx: watch::Receiver<Option<Value>> },
}

/// Handle on a store subscription. Dropping it releases the subscription.
pub struct Subscription {
    source: Source,
    primed: bool,
    last: Option<Value>,
}

impl Subscription {
    pub(crate) fn from_tree(rx: watch::Receiver<Value>, path: &str) -> Self {
        Self {
            source: Source::Tree {
                rx,
                path: path.to_string(),
            },
            primed: false,
            last: None,
        }
    }

    pub(crate) fn from_pushed(rx: watch::Receiver<Option<Value>>) -> Self {
        Self {
            source: Source::Pushed { rx },
            primed: false,
            last: None,
        }
    }

    /// Next snapshot, or `None` once the store side has gone away.
    /// Cancel-safe.
    pub async fn next(&mut self) -> Option<Value> {
        loop {
            if self.primed && self.changed().await.is_err() {
                return None;
            }
            self.primed = true;
            if let Some(value) = self.current() {
                if self.last.as_ref() != Some(&value) {
                    self.last = Some(value.clone());
                    return Some(value);
                }
            }
        }
    }

    async fn changed(&mut self) -> std::result::Result<(), watch::error::RecvError> {
        match &mut self.source {
            Source::Tree { rx, .. } => rx.changed().await,
            Source::Pushed { rx } => rx.changed().await,
        }
    }

    fn current(&mut self) -> Option<Value> {
        match &mut self.source {
            Source::Tree { rx, path } => {
                let root = rx.borrow_and_update();
                Some(tree::get(&root, path).cloned().unwrap_or(Value::Null))
            }
            Source::Pushed { rx } => rx.borrow_and_update().clone(),
        }
    }
}
