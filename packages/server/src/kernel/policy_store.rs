// PgPolicyStore - Postgres-backed policy storage
//
// Rules live in `casbin_rule` so the table stays compatible with other Casbin
// tooling pointed at the same database.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::BasePolicyStore;
use crate::domains::policy::{Effect, PolicyRule, PolicySet, RoleAssignment};

const POLICY_TYPE: &str = "p";
const GROUPING_TYPE: &str = "g";

#[derive(Debug, Clone, sqlx::FromRow)]
struct CasbinRuleRow {
    id: i32,
    ptype: String,
    v0: String,
    v1: String,
    v2: String,
    v3: String,
}

pub struct PgPolicyStore {
    pool: PgPool,
}

impl PgPolicyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the policy database and bring its schema up to date
    pub async fn connect(database_url: &str) -> Result<Self> {
        tracing::info!("Connecting to policy store...");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("Failed to connect to policy store database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run policy store migrations")?;
        tracing::info!("Policy store connected");

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert(&self, ptype: &str, fields: &[String]) -> Result<bool> {
        let field = |i: usize| fields.get(i).cloned().unwrap_or_default();
        let result = sqlx::query(
            r#"
            INSERT INTO casbin_rule (ptype, v0, v1, v2, v3)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT ON CONSTRAINT unique_key_casbin_rule DO NOTHING
            "#,
        )
        .bind(ptype)
        .bind(field(0))
        .bind(field(1))
        .bind(field(2))
        .bind(field(3))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete matching rows. With `blank_v3_matches`, rows whose fourth
    /// column is empty match as well; those load as allow rules.
    async fn delete(&self, ptype: &str, fields: &[String], blank_v3_matches: bool) -> Result<bool> {
        let field = |i: usize| fields.get(i).cloned().unwrap_or_default();
        let result = sqlx::query(
            r#"
            DELETE FROM casbin_rule
            WHERE ptype = $1 AND v0 = $2 AND v1 = $3 AND v2 = $4
              AND (v3 = $5 OR ($6 AND v3 = ''))
            "#,
        )
        .bind(ptype)
        .bind(field(0))
        .bind(field(1))
        .bind(field(2))
        .bind(field(3))
        .bind(blank_v3_matches)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl BasePolicyStore for PgPolicyStore {
    async fn load_policy(&self) -> Result<PolicySet> {
        let rows = sqlx::query_as::<_, CasbinRuleRow>(
            "SELECT id, ptype, v0, v1, v2, v3 FROM casbin_rule ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to read casbin_rule")?;

        let mut policy = PolicySet::default();
        for row in rows {
            match row.ptype.as_str() {
                POLICY_TYPE => {
                    let fields = [row.v0, row.v1, row.v2, row.v3];
                    // A rule we cannot read might be a deny; refuse to load
                    // rather than silently widen access.
                    let Some(rule) = PolicyRule::from_fields(&fields) else {
                        bail!("Malformed policy rule in casbin_rule row {}", row.id);
                    };
                    policy.rules.push(rule);
                }
                GROUPING_TYPE => {
                    if row.v0.is_empty() || row.v1.is_empty() {
                        bail!("Malformed role assignment in casbin_rule row {}", row.id);
                    }
                    policy.assignments.push(RoleAssignment::new(&row.v0, &row.v1));
                }
                other => {
                    tracing::warn!(ptype = other, id = row.id, "Ignoring unsupported policy type");
                }
            }
        }

        Ok(policy)
    }

    async fn add_rule(&self, rule: &PolicyRule) -> Result<bool> {
        self.insert(POLICY_TYPE, &rule.to_fields()).await
    }

    async fn remove_rule(&self, rule: &PolicyRule) -> Result<bool> {
        let allow = rule.effect == Effect::Allow;
        self.delete(POLICY_TYPE, &rule.to_fields(), allow).await
    }

    async fn add_assignment(&self, assignment: &RoleAssignment) -> Result<bool> {
        self.insert(GROUPING_TYPE, &assignment.to_fields()).await
    }

    async fn remove_assignment(&self, assignment: &RoleAssignment) -> Result<bool> {
        self.delete(GROUPING_TYPE, &assignment.to_fields(), false)
            .await
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Policy store unreachable")?;
        Ok(())
    }
}
