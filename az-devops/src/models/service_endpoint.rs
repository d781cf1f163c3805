use serde::Serialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Body of `POST .../_apis/serviceendpoint/endpoints`. Nesting mirrors the
/// wire format: `authorization.parameters` and the project reference array
/// must stay nested objects.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEndpointRequest {
    pub data: EndpointData,
    pub name: String,
    #[serde(rename = "type")]
    pub endpoint_type: String,
    pub url: String,
    pub authorization: EndpointAuthorization,
    pub is_shared: bool,
    pub is_ready: bool,
    pub service_endpoint_project_references: Vec<ServiceEndpointProjectReference>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointData {
    pub subscription_id: String,
    pub subscription_name: String,
    pub environment: String,
    pub scope_level: String,
    pub creation_mode: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct EndpointAuthorization {
    pub parameters: AuthorizationParameters,
    pub scheme: String,
}

/// The credential block embedded in the descriptor. The principal key is
/// plaintext on the wire; in memory it is wiped when the value drops, and
/// the Debug form never shows it.
#[derive(Clone, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct AuthorizationParameters {
    #[serde(rename = "tenantid")]
    pub tenant_id: String,
    #[serde(rename = "serviceprincipalid")]
    pub service_principal_id: String,
    #[serde(rename = "authenticationType")]
    pub authentication_type: String,
    #[serde(rename = "serviceprincipalkey")]
    pub service_principal_key: String,
}

impl std::fmt::Debug for AuthorizationParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationParameters")
            .field("tenant_id", &self.tenant_id)
            .field("service_principal_id", &self.service_principal_id)
            .field("authentication_type", &self.authentication_type)
            .field("service_principal_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEndpointProjectReference {
    pub project_reference: ProjectReference,
    pub name: String,
}

/// The id stays `None` when the project lookup resolved nothing; the
/// service is the one that rejects the submit in that case.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectReference {
    pub id: Option<String>,
    pub name: String,
}

impl ServiceEndpointRequest {
    /// Assembles an AzureRM service-connection descriptor.
    pub fn azure_rm(
        connection_name: &str,
        subscription_id: &str,
        subscription_name: &str,
        tenant_id: &str,
        service_principal_id: &str,
        service_principal_key: &str,
        project_id: Option<String>,
        project_name: &str,
    ) -> Self {
        Self {
            data: EndpointData {
                subscription_id: subscription_id.to_owned(),
                subscription_name: subscription_name.to_owned(),
                environment: "AzureCloud".to_owned(),
                scope_level: "Subscription".to_owned(),
                creation_mode: "Manual".to_owned(),
            },
            name: connection_name.to_owned(),
            endpoint_type: "AzureRM".to_owned(),
            url: "https://management.azure.com/".to_owned(),
            authorization: EndpointAuthorization {
                parameters: AuthorizationParameters {
                    tenant_id: tenant_id.to_owned(),
                    service_principal_id: service_principal_id.to_owned(),
                    authentication_type: "spnKey".to_owned(),
                    service_principal_key: service_principal_key.to_owned(),
                },
                scheme: "ServicePrincipal".to_owned(),
            },
            is_shared: false,
            is_ready: true,
            service_endpoint_project_references: vec![ServiceEndpointProjectReference {
                project_reference: ProjectReference {
                    id: project_id,
                    name: project_name.to_owned(),
                },
                name: connection_name.to_owned(),
            }],
        }
    }
}
