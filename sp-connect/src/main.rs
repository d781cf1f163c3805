use az_arm::{ArmClient, ArmCredentials};
use clap::Parser;
use secrecy::SecretString;
use sp_connect::{ConnectError, ConnectionRequest, Provisioner, DEFAULT_ROLE};
use tracing_subscriber::EnvFilter;

/// Provision an Azure service principal and register it as a service
/// connection in an Azure DevOps project.
#[derive(Parser)]
#[command(name = "sp-connect", about = "Create Azure DevOps service connections")]
struct Opts {
    /// Display name for the service principal
    #[arg(long = "name")]
    principal_name: String,

    /// Azure subscription display name
    #[arg(long)]
    subscription: String,

    /// Limit the principal to a single resource group
    #[arg(long = "resource-group")]
    resource_group: Option<String>,

    /// Role assigned at the resolved scope
    #[arg(long, default_value = DEFAULT_ROLE)]
    role: String,

    /// DevOps organization
    #[arg(long, env = "ADO_ORGANIZATION")]
    organization: String,

    /// DevOps project receiving the connection
    #[arg(long, env = "ADO_PROJECT")]
    project: String,

    /// Service connection name (defaults to the subscription name without spaces)
    #[arg(long = "connection-name")]
    connection_name: Option<String>,

    /// Username paired with the PAT
    #[arg(long, env = "ADO_USERNAME")]
    username: String,

    /// DevOps personal access token
    #[arg(long, env = "ADO_TOKEN", hide_env_values = true)]
    token: String,

    /// Entra tenant the control-plane login runs against
    #[arg(long, env = "AZURE_TENANT_ID")]
    tenant_id: String,

    /// Client id used against the control plane
    #[arg(long, env = "AZURE_CLIENT_ID")]
    client_id: String,

    /// Client secret used against the control plane
    #[arg(long, env = "AZURE_CLIENT_SECRET", hide_env_values = true)]
    client_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sp_connect=info,az_arm=info,az_devops=info")),
        )
        .init();

    let opts = Opts::parse();

    let credentials = ArmCredentials {
        tenant_id: opts.tenant_id,
        client_id: opts.client_id,
        client_secret: SecretString::from(opts.client_secret),
    };
    let control_plane = ArmClient::new(credentials)?;

    let request = ConnectionRequest {
        principal_name: opts.principal_name,
        subscription_name: opts.subscription,
        resource_group: opts.resource_group,
        role_name: opts.role,
        organization: opts.organization,
        project: opts.project,
        connection_name: opts.connection_name,
        username: opts.username,
        token: SecretString::from(opts.token),
    };

    let provisioner = Provisioner::new(control_plane);
    match provisioner.create_service_connection(&request).await {
        Ok(connection) => {
            println!("{}", serde_json::to_string_pretty(&connection)?);
            Ok(())
        }
        // A principal created before a DevOps-side failure stays behind;
        // tell the operator what to clean up.
        Err(err @ ConnectError::DevOps(_)) => Err(anyhow::anyhow!(
            "{err}; service principal `{}` was created and is left in place",
            request.principal_name
        )),
        Err(err) => Err(err.into()),
    }
}
