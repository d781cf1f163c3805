mod project;
mod service_endpoint;

pub use project::*;
pub use service_endpoint::*;
