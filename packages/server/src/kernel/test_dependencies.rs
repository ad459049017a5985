// Test dependencies - in-process implementations of the kernel traits
//
// Used by unit tests, the HTTP tests, and local development without a
// database or auth provider.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use super::{BaseAuthAdmin, BaseAuthProvider, BasePolicyStore};
use crate::common::auth::{SessionCookies, SessionResolution, SessionTokens, Subject};
use crate::domains::employees::NewEmployee;
use crate::domains::policy::{PolicyRule, PolicySet, RoleAssignment};

// =============================================================================
// Memory Policy Store
// =============================================================================

pub struct MemoryPolicyStore {
    policy: Mutex<PolicySet>,
    fail_loads: AtomicBool,
    fail_writes: AtomicBool,
    delay_next_load: Mutex<Option<Duration>>,
    loads: AtomicUsize,
}

impl MemoryPolicyStore {
    pub fn new() -> Self {
        Self::with_policy(PolicySet::default())
    }

    pub fn with_policy(policy: PolicySet) -> Self {
        Self {
            policy: Mutex::new(policy),
            fail_loads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            delay_next_load: Mutex::new(None),
            loads: AtomicUsize::new(0),
        }
    }

    /// Make subsequent loads fail as if the store were unreachable
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail while loads keep working
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Hold the next load's result for `delay` after the set has been read
    pub fn delay_next_load(&self, delay: Duration) {
        *self.delay_next_load.lock().unwrap() = Some(delay);
    }

    /// Number of load attempts so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> PolicySet {
        self.policy.lock().unwrap().clone()
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("policy store rejected write");
        }
        Ok(())
    }
}

impl Default for MemoryPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BasePolicyStore for MemoryPolicyStore {
    async fn load_policy(&self) -> Result<PolicySet> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads.load(Ordering::SeqCst) {
            bail!("policy store unavailable");
        }
        let policy = self.snapshot();
        let delay = self.delay_next_load.lock().unwrap().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(policy)
    }

    async fn add_rule(&self, rule: &PolicyRule) -> Result<bool> {
        self.ensure_writable()?;
        let mut policy = self.policy.lock().unwrap();
        if policy.rules.contains(rule) {
            return Ok(false);
        }
        policy.rules.push(rule.clone());
        Ok(true)
    }

    async fn remove_rule(&self, rule: &PolicyRule) -> Result<bool> {
        self.ensure_writable()?;
        let mut policy = self.policy.lock().unwrap();
        let before = policy.rules.len();
        policy.rules.retain(|r| r != rule);
        Ok(policy.rules.len() != before)
    }

    async fn add_assignment(&self, assignment: &RoleAssignment) -> Result<bool> {
        self.ensure_writable()?;
        let mut policy = self.policy.lock().unwrap();
        if policy.assignments.contains(assignment) {
            return Ok(false);
        }
        policy.assignments.push(assignment.clone());
        Ok(true)
    }

    async fn remove_assignment(&self, assignment: &RoleAssignment) -> Result<bool> {
        self.ensure_writable()?;
        let mut policy = self.policy.lock().unwrap();
        let before = policy.assignments.len();
        policy.assignments.retain(|a| a != assignment);
        Ok(policy.assignments.len() != before)
    }

    async fn ping(&self) -> Result<()> {
        if self.fail_loads.load(Ordering::SeqCst) {
            bail!("policy store unavailable");
        }
        Ok(())
    }
}

// =============================================================================
// Mock Auth Provider
// =============================================================================

pub struct MockAuthProvider {
    sessions: Mutex<HashMap<String, Subject>>,
    refreshable: Mutex<HashMap<String, (Subject, SessionTokens)>>,
    credentials: Mutex<HashMap<(String, String), Subject>>,
    failing: AtomicBool,
    resolve_calls: AtomicUsize,
    sign_outs: Mutex<Vec<String>>,
}

impl MockAuthProvider {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            refreshable: Mutex::new(HashMap::new()),
            credentials: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
            resolve_calls: AtomicUsize::new(0),
            sign_outs: Mutex::new(Vec::new()),
        }
    }

    /// Accept `access_token` as a live session for `subject`
    pub fn with_session(self, access_token: &str, subject: Subject) -> Self {
        self.sessions
            .lock()
            .unwrap()
            .insert(access_token.to_string(), subject);
        self
    }

    /// Exchange `refresh_token` for `tokens` on the next resolve
    pub fn with_refresh(self, refresh_token: &str, subject: Subject, tokens: SessionTokens) -> Self {
        self.refreshable
            .lock()
            .unwrap()
            .insert(refresh_token.to_string(), (subject, tokens));
        self
    }

    pub fn with_credentials(self, email: &str, password: &str, subject: Subject) -> Self {
        self.credentials
            .lock()
            .unwrap()
            .insert((email.to_string(), password.to_string()), subject);
        self
    }

    /// Make every call fail as if the provider were down
    pub fn fail_requests(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    pub fn resolve_count(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn signed_out_tokens(&self) -> Vec<String> {
        self.sign_outs.lock().unwrap().clone()
    }

    fn ensure_up(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("auth provider unavailable");
        }
        Ok(())
    }
}

impl Default for MockAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAuthProvider for MockAuthProvider {
    async fn resolve_session(&self, cookies: &SessionCookies) -> Result<SessionResolution> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_up()?;

        if let Some(access_token) = &cookies.access_token {
            if let Some(subject) = self.sessions.lock().unwrap().get(access_token) {
                return Ok(SessionResolution::authenticated(subject.clone()));
            }
        }

        if let Some(refresh_token) = &cookies.refresh_token {
            // Refresh tokens are single use
            let refreshed = self.refreshable.lock().unwrap().remove(refresh_token);
            if let Some((subject, tokens)) = refreshed {
                self.sessions
                    .lock()
                    .unwrap()
                    .insert(tokens.access_token.clone(), subject.clone());
                return Ok(SessionResolution::refreshed(subject, tokens));
            }
        }

        Ok(SessionResolution::anonymous())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<(Subject, SessionTokens)>> {
        self.ensure_up()?;

        let subject = self
            .credentials
            .lock()
            .unwrap()
            .get(&(email.to_string(), password.to_string()))
            .cloned();
        let Some(subject) = subject else {
            return Ok(None);
        };

        let tokens = SessionTokens {
            access_token: format!("access-{}", Uuid::new_v4()),
            refresh_token: format!("refresh-{}", Uuid::new_v4()),
            expires_in: 3600,
            expires_at: None,
        };
        self.sessions
            .lock()
            .unwrap()
            .insert(tokens.access_token.clone(), subject.clone());
        Ok(Some((subject, tokens)))
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        self.ensure_up()?;
        self.sessions.lock().unwrap().remove(access_token);
        self.sign_outs.lock().unwrap().push(access_token.to_string());
        Ok(())
    }
}

// =============================================================================
// Mock Auth Admin
// =============================================================================

pub struct MockAuthAdmin {
    invites: Mutex<Vec<NewEmployee>>,
}

impl MockAuthAdmin {
    pub fn new() -> Self {
        Self {
            invites: Mutex::new(Vec::new()),
        }
    }

    pub fn invites(&self) -> Vec<NewEmployee> {
        self.invites.lock().unwrap().clone()
    }
}

impl Default for MockAuthAdmin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAuthAdmin for MockAuthAdmin {
    async fn invite_user(&self, employee: &NewEmployee) -> Result<Subject> {
        self.invites.lock().unwrap().push(employee.clone());
        Ok(Subject {
            id: Uuid::new_v4(),
            name: employee.name.clone(),
            email: employee.email.clone(),
            role: employee.role,
        })
    }
}
