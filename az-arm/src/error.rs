use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArmError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("subscription `{0}` was not found")]
    SubscriptionNotFound(String),
    #[error("failed to look up subscriptions: {0}")]
    SubscriptionLookup(String),
    #[error("resource group `{0}` was not found")]
    ResourceGroupNotFound(String),
    #[error("role definition `{0}` was not found")]
    RoleNotFound(String),
    #[error("failed to create service principal: {0}")]
    PrincipalCreation(String),
    #[error("control plane error: {0}")]
    Cloud(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
