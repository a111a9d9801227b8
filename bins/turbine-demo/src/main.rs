mod app;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use turbine_api::{App, AppConfig, Turbine, TurbineError};
use turbine_build::{BuildOptions, BuildTurbine};
use turbine_local::LocalTurbine;
use turbine_platform::PlatformTurbine;

use crate::app::DemoApp;

#[derive(Parser)]
#[command(name = "turbine-demo", about = "Demo pipeline: anonymize user activity")]
struct Cli {
    /// Environment secret to register before processing. Repeatable.
    #[arg(long = "secret", global = true)]
    secrets: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run against fixture files.
    Local {
        #[arg(long, default_value = "app.json", env = "TURBINE_APP_CONFIG")]
        config: PathBuf,
    },
    /// Validate the pipeline against a build service.
    Build {
        /// Build service address (`host:port`).
        #[arg(long, env = "TURBINE_BUILD_ADDR")]
        addr: String,

        #[arg(long, env = "TURBINE_GIT_SHA")]
        git_sha: String,

        #[arg(long, default_value = ".")]
        app_path: String,

        #[arg(long, default_value = "turbine-demo")]
        app_name: String,

        /// Per-call deadline in seconds.
        #[arg(long)]
        rpc_timeout: Option<u64>,
    },
    /// Walk the pipeline against the platform backend without deploying.
    Plan {
        #[arg(long, default_value = "app.json", env = "TURBINE_APP_CONFIG")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let app = DemoApp {
        secrets: cli.secrets,
    };

    if let Err(e) = run(&app, cli.command).await {
        tracing::error!(error = %e, fatal = e.is_fatal(), "pipeline failed");
        std::process::exit(1);
    }
}

async fn run(app: &DemoApp, command: Command) -> Result<(), TurbineError> {
    match command {
        Command::Local { config } => {
            tracing::info!(config = %config.display(), "running locally");
            let mut turbine = LocalTurbine::from_config_file(&config)?;
            execute(app, &mut turbine).await
        }
        Command::Build {
            addr,
            git_sha,
            app_path,
            app_name,
            rpc_timeout,
        } => {
            let mut turbine = BuildTurbine::connect(BuildOptions {
                addr,
                git_sha,
                app_path,
                app_name,
                rpc_timeout: rpc_timeout.map(Duration::from_secs),
            })
            .await?;
            execute(app, &mut turbine).await
        }
        Command::Plan { config } => {
            let config = AppConfig::load(&config)?;
            let mut turbine = PlatformTurbine::dry_run(config.pipeline);
            execute(app, &mut turbine).await?;
            tracing::info!(
                pipeline = %turbine.pipeline(),
                functions = ?turbine.list_functions(),
                "plan complete"
            );
            Ok(())
        }
    }
}

async fn execute(app: &DemoApp, turbine: &mut dyn Turbine) -> Result<(), TurbineError> {
    app.run(turbine).await?;
    tracing::info!("pipeline finished");
    Ok(())
}
