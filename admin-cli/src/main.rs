mod api;

use api::{ApiClient, SetupForm};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "nodemc-admin")]
#[command(about = "Admin CLI for NodeMC")]
struct Cli {
    /// Base URL of the NodeMC service
    #[arg(long, global = true, default_value = "http://127.0.0.1:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the setup API key (only available before setup)
    Apikey,
    /// Run first-run setup
    Setup {
        #[arg(long, default_value = "25565")]
        mc_port: String,
        /// Server memory in megabytes
        #[arg(long, default_value = "1024")]
        memory: String,
        #[arg(long)]
        directory: String,
        #[arg(long)]
        flavour: Option<String>,
        #[arg(long)]
        version: Option<String>,
        #[arg(long, default_value = "3000")]
        nmc_port: String,
    },
    /// Create a user account
    CreateUser {
        #[arg(long)]
        username: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Delete a user account
    DeleteUser {
        #[arg(long)]
        username: String,
        /// API key sent as the bearer credential
        #[arg(long, env = "NODEMC_API_KEY")]
        api_key: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nodemc_admin=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let client = ApiClient::new(&cli.url)?;

    match cli.command {
        Commands::Apikey => {
            println!("{}", client.apikey().await?);
        }
        Commands::Setup {
            mc_port,
            memory,
            directory,
            flavour,
            version,
            nmc_port,
        } => {
            client
                .setup(&SetupForm {
                    mc_port,
                    memory,
                    directory,
                    flavour,
                    version,
                    nmc_port,
                })
                .await?;
            info!("Setup complete. Restart the NodeMC service to apply it.");
        }
        Commands::CreateUser { username, password } => {
            let password = match password {
                Some(p) => p,
                None => rpassword::read_password_from_tty(Some("Password: "))?,
            };
            let code = client.create_user(&username, &password).await?;
            info!("{}", code);
        }
        Commands::DeleteUser { username, api_key } => {
            let code = client.delete_user(&username, &api_key).await?;
            info!("{}", code);
        }
    }

    Ok(())
}
