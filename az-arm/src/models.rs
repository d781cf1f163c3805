use secrecy::SecretString;
use serde::Deserialize;

/// An Azure subscription as returned by the control plane.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(rename = "subscriptionId")]
    pub id: String,
    pub tenant_id: String,
    pub display_name: String,
    #[serde(default)]
    pub state: Option<String>,
}

/// A role definition resolved by role name at subscription scope.
#[derive(Clone, Debug, Deserialize)]
pub struct RoleDefinition {
    /// Fully qualified ARM id, used as `roleDefinitionId` in assignments.
    pub id: String,
    /// The definition GUID.
    pub name: String,
}

/// A freshly created service principal. The secret is wiped when the value
/// drops; callers read it once, at the point the credential is embedded.
pub struct ServicePrincipal {
    pub app_id: String,
    pub object_id: String,
    pub tenant_id: String,
    pub secret: SecretString,
}

impl std::fmt::Debug for ServicePrincipal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServicePrincipal")
            .field("app_id", &self.app_id)
            .field("object_id", &self.object_id)
            .field("tenant_id", &self.tenant_id)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Generic `{ "value": [...] }` list wrapper shared by ARM and Graph.
#[derive(Debug, Deserialize)]
pub struct ValueList<T> {
    pub value: Vec<T>,
}
