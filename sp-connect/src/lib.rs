mod error;
mod request;
mod scope;

pub use error::ConnectError;
pub use request::{ConnectionRequest, DEFAULT_ROLE};
pub use scope::AuthorizationScope;

use az_arm::ControlPlane;
use az_devops::{ConnectionClient, ServiceEndpointRequest};
use secrecy::ExposeSecret;
use tracing::{info, warn};

/// Runs the provisioning workflow: resolve the subscription and scope,
/// create a scoped service principal, register it as an AzureRM service
/// connection in a DevOps project.
pub struct Provisioner<C> {
    control_plane: C,
    devops_base_url: String,
}

impl<C: ControlPlane> Provisioner<C> {
    pub fn new(control_plane: C) -> Self {
        Self {
            control_plane,
            devops_base_url: "https://dev.azure.com".to_owned(),
        }
    }

    /// Points the DevOps side at a different host, primarily for tests.
    pub fn with_devops_base_url(control_plane: C, base_url: impl Into<String>) -> Self {
        Self {
            control_plane,
            devops_base_url: base_url.into(),
        }
    }

    /// The single operation. Fail-fast: the first error aborts the run, and
    /// a principal created before a later DevOps-side failure is left in
    /// place (no compensating rollback).
    pub async fn create_service_connection(
        &self,
        request: &ConnectionRequest,
    ) -> Result<serde_json::Value, ConnectError> {
        request.validate()?;

        let subscription = self
            .control_plane
            .find_subscription(&request.subscription_name)
            .await?;
        info!(subscription_id = %subscription.id, "resolved subscription");

        self.control_plane
            .find_role_definition(&subscription.id, &request.role_name)
            .await?;

        let scope = match &request.resource_group {
            Some(group) => {
                self.control_plane
                    .ensure_resource_group(&subscription.id, group)
                    .await?;
                AuthorizationScope::resource_group(&subscription.id, group)
            }
            None => AuthorizationScope::subscription(&subscription.id),
        };
        info!(scope = %scope, "resolved authorization scope");

        let principal = self
            .control_plane
            .create_service_principal(&request.principal_name, &request.role_name, scope.as_str())
            .await?;
        info!(app_id = %principal.app_id, "created service principal");

        let devops = ConnectionClient::with_base_url(
            &self.devops_base_url,
            &request.organization,
            &request.username,
            &request.token,
        )?;

        let project_id = devops.find_project_id(&request.project).await?;
        if project_id.is_none() {
            warn!(
                project = %request.project,
                "project not found; submitting with an empty project reference"
            );
        }

        let connection_name = request.connection_name();
        let descriptor = ServiceEndpointRequest::azure_rm(
            &connection_name,
            &subscription.id,
            &request.subscription_name,
            &subscription.tenant_id,
            &principal.app_id,
            principal.secret.expose_secret(),
            project_id,
            &request.project,
        );

        let created = devops
            .create_service_endpoint(&request.project, &descriptor)
            .await;
        // The descriptor owns the only other copy of the plaintext key;
        // wiped here, right after the submit, whatever the outcome.
        drop(descriptor);
        let created = created?;

        info!(connection = %connection_name, "service connection created");

        Ok(created)
    }
}
