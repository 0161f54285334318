use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use ethers::utils::to_checksum;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use quizchain_deployer::application::plans::quiz_chain_plan;
use quizchain_deployer::application::services::{load_plan_artifacts, verify_deployment};
use quizchain_deployer::domain::StepKind;
use quizchain_deployer::infrastructure::contracts::addresses::{load_deployment, record_from_run, save_deployment};
use quizchain_deployer::infrastructure::contracts::config::{load_config, DEFAULT_NETWORK};
use quizchain_deployer::infrastructure::contracts::{EthersExecutor, EtherscanVerifier, HardhatArtifacts};
use quizchain_deployer::DeploymentOrchestrator;

#[derive(Parser)]
#[command(name = "quizchain-deployer")]
#[command(about = "Deploy and verify the QuizChain contracts")]
#[command(version)]
struct Cli {
    /// Network to use: base, base_sepolia or hardhat
    #[arg(short, long, env = "NETWORK", default_value = DEFAULT_NETWORK)]
    network: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy QCToken and QuizChainChallenge, then approve and fund rewards
    Deploy,

    /// Submit recorded contracts for explorer verification
    Verify {
        /// Deployment record (defaults to <DEPLOYMENTS_DIR>/<network>.json)
        #[arg(short, long)]
        deployment: Option<PathBuf>,
    },

    /// Check the plan against local artifacts without touching the chain
    Plan,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            let mut source = e.source();
            while let Some(cause) = source {
                error!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = load_config(&cli.network)?;
    let artifacts = HardhatArtifacts::new(&config.artifacts_dir);

    match cli.command {
        Commands::Deploy => {
            let plan = quiz_chain_plan()?;
            let executor = EthersExecutor::new(&config).await?;
            let currency = &config.network.native_currency;
            info!("Deployer balance: {}", currency.format(executor.balance().await?)?);

            let run = DeploymentOrchestrator::new(&executor, &artifacts).execute(&plan).await?;

            for resource in &run.resources {
                println!("{} deployed to: {}", resource.name, to_checksum(&resource.address, None));
                if let Some(url) = config.network.explorer_address_url(resource.address) {
                    println!("  {}", url);
                }
            }

            let record = record_from_run(&config.network, executor.address(), &run);
            save_deployment(&config.deployment_file(), &record)?;
        }
        Commands::Verify { deployment } => {
            let path = deployment.unwrap_or_else(|| config.deployment_file());
            let record = load_deployment(&path)?;
            let verifier = EtherscanVerifier::new(&config.network, config.etherscan_api_key.as_deref())?;

            for (name, status) in verify_deployment(&verifier, &artifacts, &record).await? {
                println!("{}: {:?}", name, status);
            }
        }
        Commands::Plan => {
            let plan = quiz_chain_plan()?;
            load_plan_artifacts(&plan, &artifacts)?;

            for (index, step) in plan.steps().iter().enumerate() {
                let kind = match &step.kind {
                    StepKind::Deploy { .. } => "DEPLOY",
                    StepKind::Invoke { .. } => "INVOKE",
                };
                println!("{:>2}. {} {}", index, kind, step.label);
            }
        }
    }

    Ok(())
}
