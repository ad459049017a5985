//! Process-wide enforcer lifecycle.
//!
//! `EnforcerCell` owns at most one `PolicyEnforcer`. The first caller of
//! `get_or_initialize` connects to the store and loads the policy; callers
//! that arrive while that is in flight wait on the same initialization
//! instead of starting their own. A failed initialization leaves the cell
//! empty, so the next caller starts over and nothing partial is cached.

use anyhow::{Context, Result};
use std::future::Future;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

use super::PolicyEnforcer;
use crate::config::Config;
use crate::kernel::{BasePolicyStore, PgPolicyStore};

pub struct EnforcerCell {
    current: RwLock<Option<Arc<PolicyEnforcer>>>,
    init: Mutex<()>,
}

impl EnforcerCell {
    pub const fn new() -> Self {
        Self {
            current: RwLock::new(None),
            init: Mutex::const_new(()),
        }
    }

    /// Return the shared enforcer, initializing it on first use.
    ///
    /// `connect` opens the policy store. It runs at most once per successful
    /// initialization no matter how many callers race here.
    pub async fn get_or_initialize<F, Fut>(&self, connect: F) -> Result<Arc<PolicyEnforcer>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn BasePolicyStore>>>,
    {
        if let Some(enforcer) = self.get() {
            return Ok(enforcer);
        }

        let _initializing = self.init.lock().await;
        // Another caller may have finished while we waited
        if let Some(enforcer) = self.get() {
            return Ok(enforcer);
        }

        let result = async {
            let store = connect()
                .await
                .context("Failed to connect to policy store")?;
            PolicyEnforcer::initialize(store).await
        }
        .await;

        match result {
            Ok(enforcer) => {
                let enforcer = Arc::new(enforcer);
                *self
                    .current
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(enforcer.clone());
                Ok(enforcer)
            }
            Err(e) => {
                tracing::error!(error = %e, "Policy enforcer initialization failed");
                Err(e)
            }
        }
    }

    /// The enforcer, if initialization has completed
    pub fn get(&self) -> Option<Arc<PolicyEnforcer>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.get().is_some()
    }

    /// Drop the held enforcer so the next call re-initializes.
    /// Outstanding `Arc`s keep working against the old snapshot.
    pub fn reset(&self) -> Option<Arc<PolicyEnforcer>> {
        self.current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

impl Default for EnforcerCell {
    fn default() -> Self {
        Self::new()
    }
}

static ENFORCER: EnforcerCell = EnforcerCell::new();

/// Shared enforcer backed by the Postgres policy store named in
/// `DATABASE_URL`.
///
/// Fails closed: a missing connection string or an unreachable store is an
/// error and no enforcer is cached.
pub async fn initialize() -> Result<Arc<PolicyEnforcer>> {
    ENFORCER
        .get_or_initialize(|| async {
            let url = Config::policy_store_url_from_env()?;
            let store = PgPolicyStore::connect(&url).await?;
            anyhow::Ok(Arc::new(store) as Arc<dyn BasePolicyStore>)
        })
        .await
}

/// The shared enforcer if `initialize` has already succeeded
pub fn global_enforcer() -> Option<Arc<PolicyEnforcer>> {
    ENFORCER.get()
}

/// Release the shared enforcer. The next `initialize` reconnects and
/// reloads the policy.
pub fn teardown() -> Option<Arc<PolicyEnforcer>> {
    let released = ENFORCER.reset();
    if released.is_some() {
        tracing::info!("Policy enforcer released");
    }
    released
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::policy::{PolicyRule, PolicySet};
    use crate::kernel::MemoryPolicyStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn seeded_store() -> Arc<MemoryPolicyStore> {
        Arc::new(MemoryPolicyStore::with_policy(PolicySet::new(
            vec![PolicyRule::allow("admin", "municipalities", "create")],
            vec![],
        )))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_initialization_runs_once() {
        let cell = Arc::new(EnforcerCell::new());
        let store = seeded_store();
        let connects = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cell = cell.clone();
            let store = store.clone();
            let connects = connects.clone();
            handles.push(tokio::spawn(async move {
                cell.get_or_initialize(|| async move {
                    connects.fetch_add(1, Ordering::SeqCst);
                    // Widen the race window
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    anyhow::Ok(store as Arc<dyn BasePolicyStore>)
                })
                .await
                .expect("initialization succeeds")
            }));
        }

        let enforcers: Vec<_> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(store.load_count(), 1);
        for enforcer in &enforcers[1..] {
            assert!(Arc::ptr_eq(&enforcers[0], enforcer));
        }
        assert!(enforcers[0].enforce("admin", "municipalities", "create"));
    }

    #[tokio::test]
    async fn test_failed_initialization_is_not_cached() {
        let cell = EnforcerCell::new();

        let result = cell
            .get_or_initialize(|| async {
                Err::<Arc<dyn BasePolicyStore>, _>(anyhow::anyhow!("connection refused"))
            })
            .await;
        assert!(result.is_err());
        assert!(!cell.is_initialized());

        let failing = Arc::new(MemoryPolicyStore::new());
        failing.fail_loads(true);
        let result = cell
            .get_or_initialize(|| async move { anyhow::Ok(failing as Arc<dyn BasePolicyStore>) })
            .await;
        assert!(result.is_err());
        assert!(cell.get().is_none());

        let store = seeded_store();
        let enforcer = cell
            .get_or_initialize(|| async move { anyhow::Ok(store as Arc<dyn BasePolicyStore>) })
            .await
            .unwrap();
        assert!(enforcer.enforce("admin", "municipalities", "create"));
        assert!(cell.is_initialized());
    }

    #[tokio::test]
    async fn test_subsequent_calls_skip_connect() {
        let cell = EnforcerCell::new();
        let connects = AtomicUsize::new(0);

        let first = cell
            .get_or_initialize(|| async {
                connects.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(seeded_store() as Arc<dyn BasePolicyStore>)
            })
            .await
            .unwrap();
        let second = cell
            .get_or_initialize(|| async {
                connects.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(seeded_store() as Arc<dyn BasePolicyStore>)
            })
            .await
            .unwrap();

        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_reset_allows_reinitialization() {
        let cell = EnforcerCell::new();
        let first = cell
            .get_or_initialize(|| async { anyhow::Ok(seeded_store() as Arc<dyn BasePolicyStore>) })
            .await
            .unwrap();

        assert!(cell.reset().is_some());
        assert!(!cell.is_initialized());

        let second = cell
            .get_or_initialize(|| async { anyhow::Ok(seeded_store() as Arc<dyn BasePolicyStore>) })
            .await
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_shared_cell_resets_through_reference() {
        let cell = Arc::new(EnforcerCell::new());
        let first = cell
            .get_or_initialize(|| async { anyhow::Ok(seeded_store() as Arc<dyn BasePolicyStore>) })
            .await
            .unwrap();

        let other = cell.clone();
        let released = tokio::spawn(async move { other.reset() }).await.unwrap();
        assert!(Arc::ptr_eq(&first, &released.unwrap()));
        assert!(cell.get().is_none());

        // Released handles keep answering from their snapshot
        assert!(first.enforce("admin", "municipalities", "create"));
    }

    #[tokio::test]
    async fn test_global_initialize_fails_closed_without_database_url() {
        let _env = crate::config::ENV_LOCK.lock().await;
        let saved = std::env::var("DATABASE_URL").ok();
        std::env::remove_var("DATABASE_URL");

        let result = initialize().await;

        if let Some(url) = saved {
            std::env::set_var("DATABASE_URL", url);
        }
        let err = result.expect_err("initialization must fail");
        assert!(format!("{err:#}").contains("DATABASE_URL"));
        assert!(global_enforcer().is_none());
        assert!(teardown().is_none());
    }
}
