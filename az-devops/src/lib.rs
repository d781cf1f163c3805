mod connection_client;
mod models;

pub use connection_client::ConnectionClient;
pub use connection_client::ConnectionClientError;
pub use models::*;
