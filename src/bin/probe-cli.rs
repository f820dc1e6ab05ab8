use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "probe-cli")]
#[command(about = "Probe a running demo-service instance", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Correlation ID sent as X-Request-ID.
    #[arg(short = 'i', long)]
    request_id: Option<String>,

    /// Request timeout in seconds.
    #[arg(short, long, default_value_t = 5)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Basic health status
    Health,
    /// Readiness probe (fails with 503 when a dependency check fails)
    Ready,
    /// Liveness probe
    Live,
    /// Prometheus metrics snapshot
    Metrics,
    /// Greeting endpoint
    Hello {
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Service information
    Info,
    /// Post a JSON document to the echo endpoint
    Echo {
        /// JSON payload
        payload: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let mut headers = HeaderMap::new();
    if let Some(id) = &cli.request_id {
        headers.insert("x-request-id", HeaderValue::from_str(id)?);
    }
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cli.timeout))
        .default_headers(headers)
        .build()?;
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
        Commands::Ready => client.get(format!("{}/health/ready", base)).send().await?,
        Commands::Live => client.get(format!("{}/health/live", base)).send().await?,
        Commands::Metrics => {
            let res = client.get(format!("{}/metrics", base)).send().await?;
            let ok = res.status().is_success();
            print!("{}", res.text().await?);
            return Ok(ok);
        }
        Commands::Hello { name } => {
            let mut req = client.get(format!("{}/api/hello", base));
            if let Some(name) = name {
                req = req.query(&[("name", name)]);
            }
            req.send().await?
        }
        Commands::Info => client.get(format!("{}/api/info", base)).send().await?,
        Commands::Echo { payload } => {
            let body: Value = serde_json::from_str(&payload)?;
            client.post(format!("{}/api/echo", base)).json(&body).send().await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<bool, Box<dyn std::error::Error>> {
    let status = res.status();
    if let Some(id) = res.headers().get("x-request-id").and_then(|v| v.to_str().ok()) {
        eprintln!("X-Request-ID: {}", id);
    }

    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) if !text.is_empty() => println!("{}", text),
        Err(_) => {}
    }

    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
    }
    Ok(status.is_success())
}
