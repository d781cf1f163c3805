use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectError {
    /// A required request field is empty; raised before any network call.
    #[error("required parameter `{0}` is missing or empty")]
    MissingParameter(&'static str),
    #[error(transparent)]
    Arm(#[from] az_arm::ArmError),
    #[error(transparent)]
    DevOps(#[from] az_devops::ConnectionClientError),
}
