use std::fmt;

/// Resource-path boundary a role assignment applies to: a whole
/// subscription, or a single resource group inside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationScope(String);

impl AuthorizationScope {
    pub fn subscription(subscription_id: &str) -> Self {
        Self(format!("/subscriptions/{subscription_id}"))
    }

    pub fn resource_group(subscription_id: &str, name: &str) -> Self {
        Self(format!(
            "/subscriptions/{subscription_id}/resourceGroups/{name}"
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthorizationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
