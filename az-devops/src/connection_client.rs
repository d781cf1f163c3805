use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;
use zeroize::Zeroizing;

use crate::models::{Project, ProjectList, ServiceEndpointRequest};

const DEFAULT_BASE_URL: &str = "https://dev.azure.com";
const PROJECTS_API_VERSION: &str = "6.0";
const ENDPOINTS_API_VERSION: &str = "6.0-preview.4";

pub struct ConnectionClient {
    client: reqwest::Client,
    base_url: String,
    organization: String,
    // Precomputed basic credentials; the raw PAT is not stored.
    auth_header: SecretString,
}

impl ConnectionClient {
    pub fn new(
        organization: &str,
        username: &str,
        pat: &SecretString,
    ) -> Result<Self, ConnectionClientError> {
        Self::with_base_url(DEFAULT_BASE_URL, organization, username, pat)
    }

    /// Points the client at a different host, primarily for tests.
    pub fn with_base_url(
        base_url: &str,
        organization: &str,
        username: &str,
        pat: &SecretString,
    ) -> Result<Self, ConnectionClientError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ConnectionClientError::Response(e.to_string()))?;

        let raw = Zeroizing::new(format!("{}:{}", username, pat.expose_secret()));
        let auth_header = SecretString::from(format!("Basic {}", STANDARD.encode(raw.as_bytes())));

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            organization: organization.to_owned(),
            auth_header,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_projects(&self) -> Result<Vec<Project>, ConnectionClientError> {
        let url = format!(
            "{}/{}/_apis/projects?api-version={}",
            self.base_url, self.organization, PROJECTS_API_VERSION
        );

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.auth_header.expose_secret())
            .send()
            .await
            .map_err(|e| ConnectionClientError::Response(e.to_string()))?;

        // An expired or revoked PAT makes the service answer with a 203
        // redirect to the sign-in page instead of a JSON body.
        if response.status() == StatusCode::NON_AUTHORITATIVE_INFORMATION {
            return Err(ConnectionClientError::TokenExpired);
        }

        if !response.status().is_success() {
            let message = error_body_message(response).await;
            if message.to_lowercase().contains("expired") {
                return Err(ConnectionClientError::TokenExpired);
            }
            return Err(ConnectionClientError::ProjectLookup(message));
        }

        let projects: ProjectList = response.json().await.map_err(|e| {
            ConnectionClientError::Parsing(format!("failed to parse project list: {e}"))
        })?;

        Ok(projects.value)
    }

    /// Resolves a project name to its id by exact, case-sensitive match.
    /// An unknown name resolves to `None`; the create call then carries an
    /// empty project reference and the service rejects the submit.
    pub async fn find_project_id(
        &self,
        name: &str,
    ) -> Result<Option<String>, ConnectionClientError> {
        let projects = self.get_projects().await?;

        Ok(projects.into_iter().find(|p| p.name == name).map(|p| p.id))
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_service_endpoint(
        &self,
        project: &str,
        request: &ServiceEndpointRequest,
    ) -> Result<Value, ConnectionClientError> {
        let url = format!(
            "{}/{}/{}/_apis/serviceendpoint/endpoints?api-version={}",
            self.base_url, self.organization, project, ENDPOINTS_API_VERSION
        );

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth_header.expose_secret())
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| ConnectionClientError::Response(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ConnectionClientError::EndpointCreation(
                error_body_message(response).await,
            ));
        }

        response.json().await.map_err(|e| {
            ConnectionClientError::Parsing(format!(
                "failed to parse service endpoint response: {e}"
            ))
        })
    }
}

/// The service reports failures as `{ "message": ... }`; fall back to the
/// raw body when that shape is absent.
async fn error_body_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|parsed| {
            parsed
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("{status}: {body}"))
}

#[derive(Error, Debug)]
pub enum ConnectionClientError {
    #[error("the personal access token is expired or invalid")]
    TokenExpired,
    #[error("failed to look up projects: {0}")]
    ProjectLookup(String),
    #[error("failed to create service connection: {0}")]
    EndpointCreation(String),
    #[error("response error: {0}")]
    Response(String),
    #[error("parsing error: {0}")]
    Parsing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ConnectionClient {
        ConnectionClient::with_base_url(
            &server.uri(),
            "fabrikam",
            "pipeline-bot",
            &SecretString::from("test-pat".to_string()),
        )
        .unwrap()
    }

    async fn mount_projects(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/fabrikam/_apis/projects"))
            .and(query_param("api-version", "6.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 2,
                "value": [
                    { "id": "P1", "name": "AzureDeployment", "state": "wellFormed" },
                    { "id": "P2", "name": "Other", "state": "wellFormed" }
                ]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn sends_basic_auth_header() {
        let server = MockServer::start().await;
        let encoded = STANDARD.encode("pipeline-bot:test-pat");
        Mock::given(method("GET"))
            .and(path("/fabrikam/_apis/projects"))
            .and(header("Authorization", format!("Basic {encoded}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 0,
                "value": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).get_projects().await.unwrap();
    }

    #[tokio::test]
    async fn resolves_project_id_by_exact_name() {
        let server = MockServer::start().await;
        mount_projects(&server).await;

        let id = client_for(&server)
            .find_project_id("AzureDeployment")
            .await
            .unwrap();

        assert_eq!(id.as_deref(), Some("P1"));
    }

    #[tokio::test]
    async fn project_match_is_case_sensitive() {
        let server = MockServer::start().await;
        mount_projects(&server).await;

        let client = client_for(&server);
        assert_eq!(client.find_project_id("azuredeployment").await.unwrap(), None);
        assert_eq!(client.find_project_id("Missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_token_message_maps_to_token_expired() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fabrikam/_apis/projects"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "message": "The personal access token used has expired."
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).get_projects().await.unwrap_err();

        assert!(matches!(err, ConnectionClientError::TokenExpired));
    }

    #[tokio::test]
    async fn sign_in_redirect_maps_to_token_expired() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fabrikam/_apis/projects"))
            .respond_with(ResponseTemplate::new(203).set_body_string("<html>Sign in</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_projects().await.unwrap_err();

        assert!(matches!(err, ConnectionClientError::TokenExpired));
    }

    #[tokio::test]
    async fn other_failures_surface_the_api_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fabrikam/_apis/projects"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "message": "TF400898: An internal error occurred."
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).get_projects().await.unwrap_err();

        assert!(matches!(
            err,
            ConnectionClientError::ProjectLookup(message) if message.contains("TF400898")
        ));
    }

    #[tokio::test]
    async fn creates_service_endpoint_and_returns_body() {
        let server = MockServer::start().await;
        let created = json!({
            "id": "endpoint-1",
            "name": "MySub01",
            "type": "AzureRM",
            "isReady": true
        });
        Mock::given(method("POST"))
            .and(path("/fabrikam/AzureDeployment/_apis/serviceendpoint/endpoints"))
            .and(query_param("api-version", "6.0-preview.4"))
            .and(body_partial_json(json!({
                "authorization": { "scheme": "ServicePrincipal" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(created.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let request = ServiceEndpointRequest::azure_rm(
            "MySub01",
            "0000-1111",
            "My Sub 01",
            "tenant-1",
            "app-123",
            "key",
            Some("P1".into()),
            "AzureDeployment",
        );
        let response = client_for(&server)
            .create_service_endpoint("AzureDeployment", &request)
            .await
            .unwrap();

        assert_eq!(response, created);
    }

    #[tokio::test]
    async fn endpoint_failure_surfaces_the_api_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fabrikam/AzureDeployment/_apis/serviceendpoint/endpoints"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "message": "TF400898: project reference is invalid."
            })))
            .mount(&server)
            .await;

        let request = ServiceEndpointRequest::azure_rm(
            "MySub01",
            "0000-1111",
            "My Sub 01",
            "tenant-1",
            "app-123",
            "key",
            None,
            "AzureDeployment",
        );
        let err = client_for(&server)
            .create_service_endpoint("AzureDeployment", &request)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ConnectionClientError::EndpointCreation(message) if message.contains("project reference")
        ));
    }
}
