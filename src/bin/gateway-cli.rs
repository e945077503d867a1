use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use service_gateway::admin::handlers::{BackendStatus, SystemStatus};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the service gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, env = "GATEWAY_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway status
    Status,
    /// List instance health, connections and latency
    Backends,
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

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            let Some(res) = check_status(res).await else {
                return Ok(());
            };
            let status: SystemStatus = res.json().await?;
            println!("version:   {}", status.version);
            println!("status:    {}", status.status);
            println!("algorithm: {}", status.algorithm);
            println!("instances: {} ({} healthy)", status.instances, status.healthy_instances);
        }
        Commands::Backends => {
            let res = client
                .get(format!("{}/admin/backends", cli.url))
                .headers(headers)
                .send()
                .await?;
            let Some(res) = check_status(res).await else {
                return Ok(());
            };
            let backends: Vec<BackendStatus> = res.json().await?;
            println!(
                "{:<40} {:<9} {:>6} {:>12} {:<9}",
                "URL", "HEALTHY", "CONNS", "LATENCY(ms)", "CIRCUIT"
            );
            for b in backends {
                println!(
                    "{:<40} {:<9} {:>6} {:>12.1} {:<9}",
                    b.instance.url,
                    b.instance.healthy,
                    b.instance.active_connections,
                    b.instance.avg_latency_ms,
                    b.circuit.as_deref().unwrap_or("-"),
                );
            }
        }
    }

    Ok(())
}

async fn check_status(res: reqwest::Response) -> Option<reqwest::Response> {
    let status = res.status();
    if status.is_success() {
        return Some(res);
    }
    eprintln!("Error: Admin API returned status {}", status);
    if let Ok(text) = res.text().await {
        eprintln!("Response: {}", text);
    }
    None
}
