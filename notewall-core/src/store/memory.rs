use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::watch;

use super::{tree, validate_mutation_path, SessionStore, Subscription};
use crate::error::Result;

/// In-process authoritative tree. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    tree: watch::Sender<Value>,
    connected: watch::Sender<bool>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_root(Value::Object(Map::new()))
    }

    pub fn with_root(root: Value) -> Self {
        let (tree, _) = watch::channel(tree::normalize(root));
        let (connected, _) = watch::channel(true);
        Self {
            inner: Arc::new(Inner { tree, connected }),
        }
    }

    /// Flip the connectivity indicator. The in-process tree stays usable;
    /// this only drives what subscribers of [`SessionStore::connectivity`] see.
    pub fn set_connected(&self, connected: bool) {
        self.inner.connected.send_if_modified(|current| {
            let changed = *current != connected;
            *current = connected;
            changed
        });
    }

    /// Copy of the whole tree.
    pub fn snapshot(&self) -> Value {
        self.inner.tree.borrow().clone()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn subscribe(&self, path: &str) -> Result<Subscription> {
        Ok(Subscription::from_tree(self.inner.tree.subscribe(), path))
    }

    fn connectivity(&self) -> watch::Receiver<bool> {
        self.inner.connected.subscribe()
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        validate_mutation_path(path)?;
        self.inner.tree.send_modify(|root| tree::set(root, path, value));
        tracing::trace!(path, "store write");
        Ok(())
    }

    async fn patch(&self, path: &str, fields: Map<String, Value>) -> Result<()> {
        validate_mutation_path(path)?;
        self.inner.tree.send_modify(|root| tree::patch(root, path, fields));
        tracing::trace!(path, "store patch");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        validate_mutation_path(path)?;
        self.inner.tree.send_modify(|root| tree::remove(root, path));
        tracing::trace!(path, "store delete");
        Ok(())
    }

    async fn write_if_absent(&self, path: &str, value: Value) -> Result<bool> {
        validate_mutation_path(path)?;
        let mut wrote = false;
        self.inner.tree.send_if_modified(|root| {
            if tree::get(root, path).is_some() {
                return false;
            }
            tree::set(root, path, value);
            wrote = true;
            true
        });
        Ok(wrote)
    }
}
