// Supabase auth clients (GoTrue REST API)
//
// SupabaseAuth uses the public anon key and backs the request gate.
// SupabaseAdmin carries the service-role key and is only handed to
// administrative actions.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

use super::{BaseAuthAdmin, BaseAuthProvider};
use crate::common::auth::{Role, SessionCookies, SessionResolution, SessionTokens, Subject};
use crate::domains::employees::NewEmployee;

/// User record as returned by the auth API
#[derive(Debug, Clone, Deserialize)]
struct ProviderUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
    #[serde(default)]
    app_metadata: Value,
}

impl ProviderUser {
    /// `app_metadata` is only writable with the service key, so its role
    /// wins over anything the user could set on themselves.
    fn into_subject(self) -> Subject {
        let role = [&self.app_metadata, &self.user_metadata]
            .into_iter()
            .find_map(|meta| meta.get("role").and_then(Value::as_str))
            .and_then(|raw| raw.parse::<Role>().ok())
            .unwrap_or_default();

        let name = ["name", "full_name"]
            .into_iter()
            .find_map(|key| self.user_metadata.get(key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();

        Subject {
            id: self.id,
            name,
            email: self.email.unwrap_or_default(),
            role,
        }
    }
}

/// Response of the token endpoint
#[derive(Debug, Clone, Deserialize)]
struct TokenGrant {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: ProviderUser,
}

impl TokenGrant {
    /// Older auth servers omit `expires_at`; derive it from `expires_in`
    fn into_parts(self) -> (Subject, SessionTokens) {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| Utc::now().timestamp() + self.expires_in);
        let tokens = SessionTokens {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_in: self.expires_in,
            expires_at: Some(expires_at),
        };
        (self.user.into_subject(), tokens)
    }
}

fn normalize_base_url(base_url: &str) -> Result<Url> {
    let mut raw = base_url.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).with_context(|| format!("Invalid auth provider URL: {base_url}"))
}

// =============================================================================
// SupabaseAuth (implements BaseAuthProvider)
// =============================================================================

#[derive(Clone)]
pub struct SupabaseAuth {
    client: reqwest::Client,
    base_url: Url,
    anon_key: String,
}

impl SupabaseAuth {
    pub fn new(base_url: &str, anon_key: String) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: normalize_base_url(base_url)?,
            anon_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid auth endpoint: {path}"))
    }

    /// `Ok(None)` when the provider rejects the token
    async fn get_user(&self, access_token: &str) -> Result<Option<Subject>> {
        let response = self
            .client
            .get(self.endpoint("auth/v1/user")?)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .context("Auth provider unreachable")?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => {
                let user: ProviderUser = response
                    .json()
                    .await
                    .context("Failed to parse auth provider user")?;
                Ok(Some(user.into_subject()))
            }
            status => anyhow::bail!("Auth provider returned {status} for user lookup"),
        }
    }

    /// `Ok(None)` when the grant is refused (bad credentials, revoked token)
    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Option<TokenGrant>> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .context("Auth provider unreachable")?;

        match response.status() {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Ok(None)
            }
            status if status.is_success() => {
                let grant = response
                    .json()
                    .await
                    .context("Failed to parse auth provider token grant")?;
                Ok(Some(grant))
            }
            status => anyhow::bail!("Auth provider returned {status} for {grant_type} grant"),
        }
    }
}

#[async_trait]
impl BaseAuthProvider for SupabaseAuth {
    async fn resolve_session(&self, cookies: &SessionCookies) -> Result<SessionResolution> {
        if let Some(access_token) = &cookies.access_token {
            if let Some(subject) = self.get_user(access_token).await? {
                return Ok(SessionResolution::authenticated(subject));
            }
        }

        if let Some(refresh_token) = &cookies.refresh_token {
            let grant = self
                .token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
                .await?;
            if let Some(grant) = grant {
                tracing::debug!("Session refreshed");
                let (subject, tokens) = grant.into_parts();
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
        let grant = self
            .token_grant("password", json!({ "email": email, "password": password }))
            .await?;
        Ok(grant.map(TokenGrant::into_parts))
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("auth/v1/logout")?)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .context("Auth provider unreachable")?;

        // An already-invalid token is as good as signed out
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(()),
            status => anyhow::bail!("Auth provider returned {status} for logout"),
        }
    }
}

// =============================================================================
// SupabaseAdmin (implements BaseAuthAdmin)
// =============================================================================

#[derive(Clone)]
pub struct SupabaseAdmin {
    client: reqwest::Client,
    base_url: Url,
    service_role_key: String,
}

impl SupabaseAdmin {
    pub fn new(base_url: &str, service_role_key: String) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: normalize_base_url(base_url)?,
            service_role_key,
        })
    }
}

#[async_trait]
impl BaseAuthAdmin for SupabaseAdmin {
    async fn invite_user(&self, employee: &NewEmployee) -> Result<Subject> {
        let url = self
            .base_url
            .join("auth/v1/invite")
            .context("Invalid auth endpoint: auth/v1/invite")?;

        let response = self
            .client
            .post(url)
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
            .json(&json!({
                "email": employee.email,
                "data": { "name": employee.name, "role": employee.role },
            }))
            .send()
            .await
            .context("Auth provider unreachable")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Auth provider returned {status} for invite: {body}");
        }

        let user: ProviderUser = response
            .json()
            .await
            .context("Failed to parse invited user")?;
        let mut subject = user.into_subject();
        // Invites only carry user_metadata; the requested role is authoritative.
        subject.role = employee.role;
        Ok(subject)
    }
}
