mod auth;
mod client;
mod control_plane;
mod error;
mod models;

pub use auth::{ArmCredentials, TokenCache};
pub use client::ArmClient;
pub use control_plane::ControlPlane;
pub use error::ArmError;
pub use models::*;
