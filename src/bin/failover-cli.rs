use clap::{Parser, Subcommand, ValueEnum};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "failover-cli")]
#[command(about = "Management CLI for the provider failover daemon", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "FAILOVER_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daemon status and current provider
    Status,
    /// Per-provider failover state
    Providers,
    /// Health status of all providers, or recent metrics of one
    Health {
        provider: Option<String>,
    },
    /// Failover event log
    Events,
    /// Failover statistics
    Stats,
    /// Switch the current provider
    Failover {
        provider: String,
    },
    /// Close every circuit breaker
    ResetBreakers,
    /// Try to recover the primary provider now
    Recover,
    /// Dump a full snapshot as JSON
    Export {
        #[arg(value_enum)]
        target: ExportTarget,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportTarget {
    Failover,
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let (method, path) = match &cli.command {
        Commands::Status => (Method::GET, "/admin/status".to_string()),
        Commands::Providers => (Method::GET, "/admin/providers".to_string()),
        Commands::Health { provider: None } => (Method::GET, "/admin/health".to_string()),
        Commands::Health { provider: Some(p) } => (Method::GET, format!("/admin/health/{}/metrics", p)),
        Commands::Events => (Method::GET, "/admin/failover/events".to_string()),
        Commands::Stats => (Method::GET, "/admin/failover/statistics".to_string()),
        Commands::Failover { provider } => (Method::POST, format!("/admin/failover/{}", provider)),
        Commands::ResetBreakers => (Method::POST, "/admin/circuit-breakers/reset".to_string()),
        Commands::Recover => (Method::POST, "/admin/recovery/check".to_string()),
        Commands::Export { target: ExportTarget::Failover } => (Method::GET, "/admin/export/failover".to_string()),
        Commands::Export { target: ExportTarget::Health } => (Method::GET, "/admin/export/health".to_string()),
    };

    let res = client
        .request(method, format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
