use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::authz::errors::AuthzError;
use crate::authz::loader::load_policies;
use crate::authz::types::PolicyDocument;

/// Source of immutable policy snapshots.
///
/// A resolution call takes one snapshot and uses it throughout, so a
/// concurrent reload never produces a mix of old and new rules.
pub trait PolicyStore: Send + Sync {
    fn snapshot(&self) -> Arc<PolicyDocument>;
}

impl PolicyStore for Arc<PolicyDocument> {
    fn snapshot(&self) -> Arc<PolicyDocument> {
        Arc::clone(self)
    }
}

/// Policy store whose document can be swapped while readers hold older snapshots.
#[derive(Debug, Default)]
pub struct SharedPolicy {
    current: RwLock<Arc<PolicyDocument>>,
}

impl SharedPolicy {
    pub fn new(doc: PolicyDocument) -> Self {
        Self {
            current: RwLock::new(Arc::new(doc)),
        }
    }

    /// Load the policy at `path` and wrap it in a store.
    pub fn load(path: &Path) -> Result<Self, AuthzError> {
        Ok(Self::new(load_policies(path)?))
    }

    /// Replace the current snapshot, returning the one it replaced.
    pub fn publish(&self, doc: PolicyDocument) -> Arc<PolicyDocument> {
        std::mem::replace(&mut *self.current.write(), Arc::new(doc))
    }

    /// Load and publish a new snapshot. On failure the current snapshot stays in place.
    pub fn reload_from(&self, path: &Path) -> Result<(), AuthzError> {
        match load_policies(path) {
            Ok(doc) => {
                self.publish(doc);
                tracing::info!(path = %path.display(), "Policy reloaded");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Policy reload failed, keeping previous snapshot");
                Err(e)
            }
        }
    }
}

impl PolicyStore for SharedPolicy {
    fn snapshot(&self) -> Arc<PolicyDocument> {
        Arc::clone(&self.current.read())
    }
}
