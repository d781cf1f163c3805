use async_trait::async_trait;

use crate::{ArmError, RoleDefinition, ServicePrincipal, Subscription};

/// The control-plane operations the provisioning workflow depends on.
///
/// [`crate::ArmClient`] is the live implementation; tests substitute their
/// own.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Resolves a subscription by display name.
    async fn find_subscription(&self, name: &str) -> Result<Subscription, ArmError>;

    /// Fails with [`ArmError::ResourceGroupNotFound`] unless the group
    /// exists in the subscription.
    async fn ensure_resource_group(
        &self,
        subscription_id: &str,
        name: &str,
    ) -> Result<(), ArmError>;

    /// Resolves a role definition by role name at subscription scope.
    async fn find_role_definition(
        &self,
        subscription_id: &str,
        role_name: &str,
    ) -> Result<RoleDefinition, ArmError>;

    /// Creates a service principal bound to `role_name` at `scope`.
    async fn create_service_principal(
        &self,
        display_name: &str,
        role_name: &str,
        scope: &str,
    ) -> Result<ServicePrincipal, ArmError>;
}
