use secrecy::{ExposeSecret, SecretString};

use crate::ConnectError;

pub const DEFAULT_ROLE: &str = "Contributor";

/// Caller-supplied parameters for one provisioning run.
#[derive(Clone, Debug)]
pub struct ConnectionRequest {
    /// Display name for the service principal to create.
    pub principal_name: String,
    /// Subscription display name the connection will target.
    pub subscription_name: String,
    /// Restrict the principal to one resource group instead of the whole
    /// subscription.
    pub resource_group: Option<String>,
    /// Role to assign at the resolved scope.
    pub role_name: String,
    /// DevOps organization name.
    pub organization: String,
    /// DevOps project the connection is registered in.
    pub project: String,
    /// Connection display name; derived from the subscription name when
    /// absent.
    pub connection_name: Option<String>,
    /// Username paired with the PAT for basic auth.
    pub username: String,
    /// DevOps personal access token.
    pub token: SecretString,
}

impl ConnectionRequest {
    /// Guard checks for the required fields, before anything touches the
    /// network.
    pub fn validate(&self) -> Result<(), ConnectError> {
        if self.principal_name.trim().is_empty() {
            return Err(ConnectError::MissingParameter("principal_name"));
        }
        if self.subscription_name.trim().is_empty() {
            return Err(ConnectError::MissingParameter("subscription_name"));
        }
        if self.role_name.trim().is_empty() {
            return Err(ConnectError::MissingParameter("role_name"));
        }
        if self.organization.trim().is_empty() {
            return Err(ConnectError::MissingParameter("organization"));
        }
        if self.project.trim().is_empty() {
            return Err(ConnectError::MissingParameter("project"));
        }
        if self.username.trim().is_empty() {
            return Err(ConnectError::MissingParameter("username"));
        }
        if self.token.expose_secret().trim().is_empty() {
            return Err(ConnectError::MissingParameter("token"));
        }

        Ok(())
    }

    /// The connection name, derived when the caller supplied none: the
    /// subscription name with every space character deleted.
    pub fn connection_name(&self) -> String {
        match &self.connection_name {
            Some(name) => name.clone(),
            None => self.subscription_name.replace(' ', ""),
        }
    }
}
