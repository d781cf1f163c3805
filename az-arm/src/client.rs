use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::SecretString;
use serde_json::{json, Value};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::auth::{ArmCredentials, TokenCache};
use crate::{ArmError, ControlPlane, RoleDefinition, ServicePrincipal, Subscription, ValueList};

const MANAGEMENT_URL: &str = "https://management.azure.com";
const GRAPH_URL: &str = "https://graph.microsoft.com";
const LOGIN_URL: &str = "https://login.microsoftonline.com";

const SUBSCRIPTIONS_API_VERSION: &str = "2022-12-01";
const RESOURCE_GROUPS_API_VERSION: &str = "2021-04-01";
const AUTHORIZATION_API_VERSION: &str = "2022-04-01";

/// Client for the Azure control plane: ARM for subscriptions, resource
/// groups, and role operations, Microsoft Graph for directory objects.
pub struct ArmClient {
    http: reqwest::Client,
    tokens: TokenCache,
    management_url: String,
    graph_url: String,
}

impl ArmClient {
    pub fn new(credentials: ArmCredentials) -> Result<Self, ArmError> {
        Self::with_endpoints(credentials, MANAGEMENT_URL, GRAPH_URL, LOGIN_URL)
    }

    /// Points the client at different hosts, primarily for tests.
    pub fn with_endpoints(
        credentials: ArmCredentials,
        management_url: impl Into<String>,
        graph_url: impl Into<String>,
        login_url: impl Into<String>,
    ) -> Result<Self, ArmError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ArmError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            tokens: TokenCache::new(credentials, login_url, http.clone()),
            http,
            management_url: management_url.into(),
            graph_url: graph_url.into(),
        })
    }

    async fn management_token(&self) -> Result<String, ArmError> {
        self.tokens
            .token_for(&format!("{}/.default", self.management_url))
            .await
    }

    async fn graph_token(&self) -> Result<String, ArmError> {
        self.tokens
            .token_for(&format!("{}/.default", self.graph_url))
            .await
    }

    async fn graph_post(&self, token: &str, path: &str, body: &Value) -> Result<Value, String> {
        let url = format!("{}/v1.0/{}", self.graph_url, path);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(read_error_message(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| format!("failed to parse response: {e}"))
    }

    async fn assign_role(
        &self,
        role: &RoleDefinition,
        principal_id: &str,
        scope: &str,
    ) -> Result<(), ArmError> {
        let token = self.management_token().await?;
        let assignment_id = Uuid::new_v4();
        let url = format!(
            "{}{}/providers/Microsoft.Authorization/roleAssignments/{}?api-version={}",
            self.management_url, scope, assignment_id, AUTHORIZATION_API_VERSION
        );
        let body = json!({
            "properties": {
                "roleDefinitionId": role.id,
                "principalId": principal_id,
            }
        });

        let response = self
            .http
            .put(&url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ArmError::PrincipalCreation(format!("role assignment: {e}")))?;

        if !response.status().is_success() {
            return Err(ArmError::PrincipalCreation(format!(
                "role assignment: {}",
                read_error_message(response).await
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl ControlPlane for ArmClient {
    #[instrument(skip(self))]
    async fn find_subscription(&self, name: &str) -> Result<Subscription, ArmError> {
        let token = self.management_token().await?;
        let url = format!(
            "{}/subscriptions?api-version={}",
            self.management_url, SUBSCRIPTIONS_API_VERSION
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ArmError::SubscriptionLookup(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ArmError::SubscriptionLookup(
                read_error_message(response).await,
            ));
        }

        let subscriptions: ValueList<Subscription> = response.json().await.map_err(|e| {
            ArmError::SubscriptionLookup(format!("failed to parse subscription list: {e}"))
        })?;

        subscriptions
            .value
            .into_iter()
            .find(|s| s.display_name == name)
            .ok_or_else(|| ArmError::SubscriptionNotFound(name.to_string()))
    }

    #[instrument(skip(self))]
    async fn ensure_resource_group(
        &self,
        subscription_id: &str,
        name: &str,
    ) -> Result<(), ArmError> {
        let token = self.management_token().await?;
        let url = format!(
            "{}/subscriptions/{}/resourcegroups/{}?api-version={}",
            self.management_url, subscription_id, name, RESOURCE_GROUPS_API_VERSION
        );

        let response = self.http.get(&url).bearer_auth(&token).send().await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(ArmError::ResourceGroupNotFound(name.to_string())),
            _ => Err(ArmError::Cloud(read_error_message(response).await)),
        }
    }

    #[instrument(skip(self))]
    async fn find_role_definition(
        &self,
        subscription_id: &str,
        role_name: &str,
    ) -> Result<RoleDefinition, ArmError> {
        let token = self.management_token().await?;
        let url = format!(
            "{}/subscriptions/{}/providers/Microsoft.Authorization/roleDefinitions",
            self.management_url, subscription_id
        );
        let filter = format!("roleName eq '{role_name}'");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("api-version", AUTHORIZATION_API_VERSION),
                ("$filter", filter.as_str()),
            ])
            .bearer_auth(&token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ArmError::Cloud(read_error_message(response).await));
        }

        let definitions: ValueList<RoleDefinition> = response
            .json()
            .await
            .map_err(|e| ArmError::Cloud(format!("failed to parse role definitions: {e}")))?;

        definitions
            .value
            .into_iter()
            .next()
            .ok_or_else(|| ArmError::RoleNotFound(role_name.to_string()))
    }

    #[instrument(skip(self))]
    async fn create_service_principal(
        &self,
        display_name: &str,
        role_name: &str,
        scope: &str,
    ) -> Result<ServicePrincipal, ArmError> {
        let subscription_id = subscription_id_from_scope(scope).ok_or_else(|| {
            ArmError::PrincipalCreation(format!("scope `{scope}` does not name a subscription"))
        })?;
        let role = self.find_role_definition(subscription_id, role_name).await?;

        let graph_token = self.graph_token().await?;

        let application = self
            .graph_post(
                &graph_token,
                "applications",
                &json!({ "displayName": display_name }),
            )
            .await
            .map_err(|e| ArmError::PrincipalCreation(format!("creating application: {e}")))?;
        let app_object_id = string_field(&application, "id").ok_or_else(|| {
            ArmError::PrincipalCreation("application response missing `id`".into())
        })?;
        let app_id = string_field(&application, "appId").ok_or_else(|| {
            ArmError::PrincipalCreation("application response missing `appId`".into())
        })?;

        let principal = self
            .graph_post(
                &graph_token,
                "servicePrincipals",
                &json!({ "appId": app_id }),
            )
            .await
            .map_err(|e| ArmError::PrincipalCreation(format!("creating service principal: {e}")))?;
        let principal_id = string_field(&principal, "id").ok_or_else(|| {
            ArmError::PrincipalCreation("service principal response missing `id`".into())
        })?;

        let credential = self
            .graph_post(
                &graph_token,
                &format!("applications/{app_object_id}/addPassword"),
                &json!({ "passwordCredential": { "displayName": display_name } }),
            )
            .await
            .map_err(|e| ArmError::PrincipalCreation(format!("adding password credential: {e}")))?;
        let secret = extract_secret(&credential).ok_or_else(|| {
            ArmError::PrincipalCreation("password credential carries no secret value".into())
        })?;

        self.assign_role(&role, &principal_id, scope).await?;

        debug!(app_id = %app_id, "service principal created");

        Ok(ServicePrincipal {
            app_id,
            object_id: principal_id,
            tenant_id: self.tokens.tenant_id().to_string(),
            secret,
        })
    }
}

fn subscription_id_from_scope(scope: &str) -> Option<&str> {
    scope
        .strip_prefix("/subscriptions/")
        .map(|rest| match rest.find('/') {
            Some(end) => &rest[..end],
            None => rest,
        })
        .filter(|id| !id.is_empty())
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_string)
}

/// The password credential arrives either flat (`secretText` at the top
/// level) or nested under `passwordCredential`, depending on the Graph
/// service version. Both shapes normalize to a plain secret here.
fn extract_secret(credential: &Value) -> Option<SecretString> {
    let text = credential
        .get("secretText")
        .or_else(|| {
            credential
                .get("passwordCredential")
                .and_then(|c| c.get("secretText"))
        })
        .and_then(Value::as_str)?;

    Some(SecretString::from(text.to_string()))
}

async fn read_error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<Value>(&body) {
        Ok(parsed) => parsed
            .get("error")
            .and_then(|e| e.get("message"))
            .or_else(|| parsed.get("message"))
            .and_then(Value::as_str)
            .map(|m| format!("{status}: {m}"))
            .unwrap_or_else(|| format!("{status}: {body}")),
        Err(_) => format!("{status}: {body}"),
    }
}
