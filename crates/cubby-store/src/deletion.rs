//! Whole-database deletion.
//!
//! Deletion can be blocked by live connections. The coordinator closes every
//! tracked connection for the name and re-issues the request, bounded by a
//! retry policy so a host that stays blocked cannot hang the caller forever.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use cubby_core::protocol::{DeleteReply, HostEngine};
use cubby_core::{Error, Result};

use crate::awaited::settle;
use crate::manager::ConnectionManager;

/// Bounds for the blocked-deletion retry loop.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum delete attempts before giving up.
    pub max_attempts: u32,
    /// Base backoff between attempts; grows linearly with the attempt count.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(20),
        }
    }
}

impl RetryPolicy {
    /// Policy for tests: few attempts, no waiting.
    pub fn for_testing() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::ZERO,
        }
    }
}

/// Deletes databases, transparently retrying blocked deletions after closing
/// tracked connections.
#[derive(Clone)]
pub(crate) struct DeletionCoordinator {
    engine: Arc<dyn HostEngine>,
    policy: RetryPolicy,
}

impl DeletionCoordinator {
    pub(crate) fn new(engine: Arc<dyn HostEngine>, policy: RetryPolicy) -> Self {
        Self { engine, policy }
    }

    /// Delete the named database.
    ///
    /// On a blocked reply, closes every connection the manager tracks for
    /// the name and re-issues the request, up to the policy's attempt bound.
    pub(crate) async fn delete_database(
        &self,
        manager: &ConnectionManager,
        name: &str,
    ) -> Result<()> {
        for attempt in 1..=self.policy.max_attempts {
            let reply = settle(|done| self.engine.delete_database(name, done)).await?;
            match reply {
                DeleteReply::Deleted => {
                    debug!("Deleted database '{}'", name);
                    return Ok(());
                }
                DeleteReply::Failed(source) => {
                    return Err(Error::Delete {
                        name: name.to_string(),
                        source,
                    });
                }
                DeleteReply::Blocked => {
                    let closed = manager.close_all(name);
                    warn!(
                        "Deletion of '{}' blocked (attempt {}/{}); closed {} tracked connection(s)",
                        name, attempt, self.policy.max_attempts, closed
                    );
                    if attempt < self.policy.max_attempts && !self.policy.backoff.is_zero() {
                        sleep(self.policy.backoff * attempt).await;
                    }
                }
            }
        }

        Err(Error::DeleteBlocked {
            name: name.to_string(),
            attempts: self.policy.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubby_core::protocol::{DatabaseHandle, Done, UpgradeHook};
    use cubby_core::EngineError;
    use cubby_engine::MemoryEngine;

    /// Host that reports every deletion blocked, no matter what.
    struct AlwaysBlocked;

    impl HostEngine for AlwaysBlocked {
        fn open_database(
            &self,
            name: &str,
            _version: u32,
            _upgrade: UpgradeHook,
            done: Done<std::result::Result<Arc<dyn DatabaseHandle>, EngineError>>,
        ) {
            done(Err(EngineError::Backend(format!("no such host: {}", name))));
        }

        fn delete_database(&self, _name: &str, done: Done<DeleteReply>) {
            done(DeleteReply::Blocked);
        }
    }

    /// Host that refuses deletion outright.
    struct RefusesDeletion;

    impl HostEngine for RefusesDeletion {
        fn open_database(
            &self,
            name: &str,
            _version: u32,
            _upgrade: UpgradeHook,
            done: Done<std::result::Result<Arc<dyn DatabaseHandle>, EngineError>>,
        ) {
            done(Err(EngineError::Backend(format!("no such host: {}", name))));
        }

        fn delete_database(&self, _name: &str, done: Done<DeleteReply>) {
            done(DeleteReply::Failed(EngineError::Backend(
                "corrupt catalog".to_string(),
            )));
        }
    }

    #[tokio::test]
    async fn test_blocked_forever_exhausts_attempts() {
        let engine: Arc<dyn HostEngine> = Arc::new(AlwaysBlocked);
        let manager = ConnectionManager::new(Arc::clone(&engine));
        let coordinator = DeletionCoordinator::new(engine, RetryPolicy::for_testing());

        let err = coordinator
            .delete_database(&manager, "db")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DeleteBlocked { attempts: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_failed_reply_is_not_retried() {
        let engine: Arc<dyn HostEngine> = Arc::new(RefusesDeletion);
        let manager = ConnectionManager::new(Arc::clone(&engine));
        let coordinator = DeletionCoordinator::new(engine, RetryPolicy::for_testing());

        let err = coordinator
            .delete_database(&manager, "db")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Delete { .. }));
    }

    #[tokio::test]
    async fn test_blocked_deletion_succeeds_after_closing() {
        let engine: Arc<dyn HostEngine> = Arc::new(MemoryEngine::new());
        let manager = ConnectionManager::new(Arc::clone(&engine));
        let coordinator = DeletionCoordinator::new(engine, RetryPolicy::for_testing());

        let held = manager
            .open("db", &["s".to_string()])
            .await
            .unwrap();
        assert!(held.is_open());

        coordinator.delete_database(&manager, "db").await.unwrap();
        assert!(!held.is_open());
        assert_eq!(manager.tracked("db"), 0);
    }
}
