//! Test harness with testcontainers for integration testing.
//!
//! One Postgres container is shared by every test in the binary. Each
//! harness gets its own freshly migrated database so policy rows written by
//! one test never leak into another's snapshot.

use anyhow::{Context, Result};
use gestao_core::kernel::PgPolicyStore;
use sqlx::PgPool;
use std::sync::Arc;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Shared test infrastructure that persists across all tests.
struct SharedTestInfra {
    host: String,
    port: u16,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_tag("16")
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let host = postgres.get_host().await?.to_string();
        let port = postgres.get_host_port_ipv4(5432).await?;

        Ok(Self {
            host,
            port,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }

    fn database_url(&self, database: &str) -> String {
        format!(
            "postgresql://postgres:postgres@{}:{}/{}",
            self.host, self.port, database
        )
    }
}

/// Test harness owning an isolated policy database.
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     ctx.store.add_rule(&PolicyRule::allow("admin", "bids", "read")).await.unwrap();
/// }
/// ```
pub struct TestHarness {
    pub database_url: String,
    pub store: Arc<PgPolicyStore>,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        // Database is dropped with the container
    }
}

impl TestHarness {
    /// Create a new database on the shared container and migrate it
    pub async fn new() -> Result<Self> {
        let infra = SharedTestInfra::get().await;

        let name = format!("policy_{}", Uuid::new_v4().simple());
        let admin = PgPool::connect(&infra.database_url("postgres"))
            .await
            .context("Failed to connect to Postgres")?;
        sqlx::query(&format!(r#"CREATE DATABASE "{name}""#))
            .execute(&admin)
            .await
            .context("Failed to create test database")?;
        admin.close().await;

        let database_url = infra.database_url(&name);
        let store = PgPolicyStore::connect(&database_url).await?;

        Ok(Self {
            database_url,
            store: Arc::new(store),
        })
    }

    pub fn pool(&self) -> &PgPool {
        self.store.pool()
    }
}
