use anyhow::{Context, Result};
use claim_flow::{
    ACCEPTED_EXTENSIONS, Attachment, ClaimField, ClaimForm, ClaimType, GatewayClientConfig,
    HttpSubmissionGateway, SubmissionResult, SubmitOutcome,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "claim-terminal", about = "File and list insurance claims through the claims gateway")]
struct Cli {
    /// Base URL of the claims gateway
    #[arg(long, default_value = "http://localhost:3000")]
    gateway: String,

    /// Give up waiting for the gateway after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// File a new claim
    Submit(SubmitArgs),
    /// List claims already filed
    List,
}

#[derive(clap::Args)]
struct SubmitArgs {
    /// auto, home, life or health
    #[arg(long, value_parser = parse_claim_type)]
    claim_type: ClaimType,

    /// What happened
    #[arg(long)]
    description: String,

    /// Date of the incident (YYYY-MM-DD)
    #[arg(long = "date")]
    date_of_incident: String,

    #[arg(long = "amount")]
    estimated_amount: String,

    #[arg(long = "policy")]
    policy_number: String,

    #[arg(long = "phone")]
    contact_phone: String,

    #[arg(long = "email")]
    contact_email: String,

    /// Supporting document; repeat for several
    #[arg(long = "attach")]
    attachments: Vec<PathBuf>,
}

fn parse_claim_type(raw: &str) -> std::result::Result<ClaimType, String> {
    raw.parse::<ClaimType>().map_err(|e| e.to_string())
}

/// The picker filter: only offer files with an accepted extension
fn pick_files(paths: &[PathBuf]) -> Vec<Attachment> {
    paths
        .iter()
        .map(Attachment::from_path)
        .filter(|attachment| {
            let accepted = attachment.matches_accept_list();
            if !accepted {
                warn!(
                    file = %attachment.name,
                    accepted = ?ACCEPTED_EXTENSIONS,
                    "skipping file with unsupported extension"
                );
            }
            accepted
        })
        .collect()
}

async fn submit(config: &GatewayClientConfig, args: SubmitArgs) -> Result<()> {
    let gateway = Arc::new(HttpSubmissionGateway::new(config).context("failed to build HTTP client")?);
    let form = ClaimForm::new(gateway).on_submit(|result| match &result {
        SubmissionResult::Submitted { message } => println!("{message}"),
        SubmissionResult::Failed { message, detail } => eprintln!("{message}: {detail}"),
    });

    form.set_field(ClaimField::ClaimType, args.claim_type.as_str());
    form.set_field(ClaimField::Description, args.description);
    form.set_field(ClaimField::DateOfIncident, args.date_of_incident);
    form.set_field(ClaimField::EstimatedAmount, args.estimated_amount);
    form.set_field(ClaimField::PolicyNumber, args.policy_number);
    form.set_field(ClaimField::ContactPhone, args.contact_phone);
    form.set_field(ClaimField::ContactEmail, args.contact_email);
    form.add_files(pick_files(&args.attachments));

    for name in form.attachment_names() {
        println!("📎 {name}");
    }

    let abandon = form.abandon_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            abandon.abandon();
        }
    });

    info!(
        claim_type = %args.claim_type.label(),
        idempotency_key = %form.idempotency_key(),
        "submitting claim"
    );

    match form.submit().await {
        SubmitOutcome::Completed(result) if result.is_success() => Ok(()),
        SubmitOutcome::Completed(_) => anyhow::bail!("claim was not accepted"),
        SubmitOutcome::Incomplete(e) => anyhow::bail!("claim is incomplete: {e}"),
        SubmitOutcome::AlreadySubmitting => anyhow::bail!("a submission is already in flight"),
        SubmitOutcome::Abandoned => {
            eprintln!("Stopped waiting for the gateway; the claim may still have been filed.");
            Ok(())
        }
    }
}

async fn list(config: &GatewayClientConfig) -> Result<()> {
    let gateway = HttpSubmissionGateway::new(config).context("failed to build HTTP client")?;
    let claims = gateway
        .list_claims()
        .await
        .context("failed to list claims")?;

    println!("{}", serde_json::to_string_pretty(&claims)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let mut config = GatewayClientConfig::new(cli.gateway);
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    match cli.command {
        Command::Submit(args) => submit(&config, args).await,
        Command::List => list(&config).await,
    }
}
