// src/main.rs
//! identity-core 命令行入口
//! 从config构建认证服务，并基于内存存储运行。
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use identity_core::auth::{
    FlowResult, FlowStep, LoginFlowHandler, MemoryStorage, ProviderKey,
};
use identity_core::{auth_manager_from_config, AuthConfig, AuthManager, ProviderRegistry};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "identity-core")]
#[command(about = "Identity and session management core")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Auth config file (defaults to $AUTH_CONFIG_PATH or auth.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured auth providers
    Providers,
    /// Register an API client and print its id and secret
    CreateClient {
        #[arg(long)]
        name: String,
    },
    /// Run a username/password login flow and issue a token
    Login {
        /// Provider type
        #[arg(long, default_value = "insecure_example")]
        provider: String,
        /// Provider id, when the type is configured more than once
        #[arg(long)]
        provider_id: Option<String>,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging()?;

    let config = match &args.config {
        Some(path) => {
            let mut config = AuthConfig::from_file(path)?;
            config.apply_env_overrides()?;
            config
        }
        None => AuthConfig::load()?,
    };

    let registry = ProviderRegistry::with_builtin();
    let manager = auth_manager_from_config(&config, &registry, Arc::new(MemoryStorage)).await?;

    match args.command {
        Commands::Providers => {
            for provider in manager.auth_providers() {
                println!("{}", serde_json::to_string(&provider)?);
            }
        }
        Commands::CreateClient { name } => {
            let client = manager.create_client(&name).await?;
            println!(
                "{}",
                json!({ "name": client.name, "id": client.id, "secret": client.secret })
            );
        }
        Commands::Login {
            provider,
            provider_id,
            username,
            password,
        } => {
            let key = ProviderKey::new(provider, provider_id.as_deref());
            login(&manager, key, &username, &password).await?;
        }
    }

    Ok(())
}

/// 以flow engine的方式驱动provider的flow
async fn login(manager: &AuthManager, key: ProviderKey, username: &str, password: &str) -> Result<()> {
    let mut flow = manager.create_login_flow(&key).await?;

    let mut step = flow.step("init", None).await?;
    let mut submitted = false;
    let data = loop {
        match step {
            FlowStep::Form { step_id, errors } => {
                if submitted {
                    bail!("login rejected: {:?}", errors);
                }
                submitted = true;
                step = flow
                    .step(&step_id, Some(json!({ "username": username, "password": password })))
                    .await?;
            }
            FlowStep::CreateEntry { data } => break data,
            FlowStep::Abort { reason } => bail!("login aborted: {reason}"),
        }
    };

    let mut credentials = manager
        .finish_login_flow(FlowResult { handler: key, data })
        .await?;
    let user = manager.get_or_create_user(&mut credentials).await?;

    let client = manager.create_client("cli").await?;
    let token = manager.create_token(&user.id, &client.id).await?;
    info!(user_id = %user.id, "login complete");

    println!(
        "{}",
        json!({
            "user": user.as_view(),
            "token": {
                "id": token.id,
                "client_id": token.client_id,
                "expires_at": token.expires_at(),
            },
        })
    );
    Ok(())
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
