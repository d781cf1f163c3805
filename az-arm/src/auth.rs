use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::ArmError;

/// Entra application credentials used for the client-credentials flow.
pub struct ArmCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Returns true if the token is expired or will expire within the grace
    /// period.
    fn is_expired(&self, grace: Duration) -> bool {
        Utc::now() + grace >= self.expires_at
    }
}

/// Acquires and caches access tokens, one per resource scope. The control
/// plane needs two: ARM for subscriptions and role operations, Graph for
/// directory objects.
pub struct TokenCache {
    credentials: ArmCredentials,
    login_url: String,
    http: reqwest::Client,
    tokens: RwLock<HashMap<String, CachedToken>>,
    grace: Duration,
}

impl TokenCache {
    pub fn new(
        credentials: ArmCredentials,
        login_url: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            credentials,
            login_url: login_url.into(),
            http,
            tokens: RwLock::new(HashMap::new()),
            grace: Duration::minutes(5),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.credentials.tenant_id
    }

    /// Returns a valid token for `scope`, refreshing when the cached one is
    /// within the expiry grace period.
    pub async fn token_for(&self, scope: &str) -> Result<String, ArmError> {
        {
            let tokens = self.tokens.read().await;
            if let Some(token) = tokens.get(scope) {
                if !token.is_expired(self.grace) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        debug!(scope, "acquiring access token");
        let token = self.acquire(scope).await?;
        let access_token = token.access_token.clone();
        self.tokens.write().await.insert(scope.to_string(), token);

        Ok(access_token)
    }

    async fn acquire(&self, scope: &str) -> Result<CachedToken, ArmError> {
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_url, self.credentials.tenant_id
        );

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.expose_secret()),
            ("scope", scope),
        ];

        let response = self
            .http
            .post(&token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ArmError::Auth(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ArmError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ArmError::Auth(format!("failed to parse token response: {e}")))?;

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }
}
