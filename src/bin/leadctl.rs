use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use lead_api::app;
use lead_api::auth::{AuthGate, Identity};
use lead_api::config::AppConfig;
use lead_api::database::PgLeadStore;

#[derive(Parser)]
#[command(name = "leadctl")]
#[command(about = "Lead API operator tool - tokens, schema and connectivity")]
#[command(version)]
struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Sign an access token with the configured JWT_SECRET")]
    Token {
        #[arg(long, help = "Subject recorded as the lead owner")]
        subject: String,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        role: Option<String>,

        #[arg(long, help = "Lifetime in hours (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
        hours: Option<i64>,
    },

    #[command(about = "Create the leads table and indexes in DATABASE_URL")]
    Migrate,

    #[command(about = "Validate configuration and ping the lead store (read-only)")]
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("Error: {e:?}"),
            _ => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;

    match cli.command {
        Commands::Token {
            subject,
            email,
            role,
            hours,
        } => {
            let gate = AuthGate::new(&config.security);
            let identity = Identity {
                subject,
                email,
                role,
            };
            let token = match hours {
                Some(h) if h <= 0 => bail!("--hours must be positive"),
                Some(h) => gate.issue_with_expiry(&identity, chrono::Duration::hours(h))?,
                None => gate.issue(&identity)?,
            };

            if cli.json {
                output(true, "Token issued", Some(json!({ "token": token })))
            } else {
                println!("{}", token);
                Ok(())
            }
        }

        Commands::Migrate => {
            let url = config
                .database
                .url
                .as_deref()
                .context("DATABASE_URL is not set")?;
            let store = PgLeadStore::connect(url, &config.database).await?;
            store.ensure_schema().await?;
            output(cli.json, "Lead schema is up to date", None)
        }

        Commands::Check => {
            let total = app::ping_store(&config)
                .await
                .context("lead store is unreachable")?;

            output(
                cli.json,
                &format!("Lead store reachable ({} leads)", total),
                Some(json!({
                    "environment": format!("{:?}", config.environment),
                    "store": if config.database.url.is_some() { "postgres" } else { "memory" },
                    "leads": total,
                })),
            )
        }
    }
}

fn output(json_output: bool, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    if json_output {
        let mut response = json!({ "success": true, "message": message });
        if let (Some(Value::Object(extra)), Some(body)) = (data, response.as_object_mut()) {
            body.extend(extra);
        }
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("✓ {}", message);
    }
    Ok(())
}
