use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the Service Gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate health of all services
    Health,
    /// Gateway and per-service statistics
    Stats,
    /// List registered service instances
    Services,
    /// List management endpoints and proxied prefixes
    Routes,
    /// Register a service instance
    Register {
        /// Logical service name
        name: String,
        /// Instance base URL
        #[arg(long)]
        instance_url: String,
        #[arg(long)]
        weight: Option<i64>,
        #[arg(long)]
        health_check_path: Option<String>,
    },
    /// Unregister one instance, or every instance of a service
    Unregister {
        name: String,
        /// Instance id; omit to remove the whole service
        #[arg(long)]
        id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
        Commands::Stats => client.get(format!("{}/gateway/stats", base)).send().await?,
        Commands::Services => client.get(format!("{}/gateway/services", base)).send().await?,
        Commands::Routes => client.get(format!("{}/gateway/routes", base)).send().await?,
        Commands::Register {
            name,
            instance_url,
            weight,
            health_check_path,
        } => {
            let mut body = json!({ "url": instance_url });
            if let Some(weight) = weight {
                body["weight"] = json!(weight);
            }
            if let Some(path) = health_check_path {
                body["health_check_path"] = json!(path);
            }
            client
                .post(format!("{}/gateway/services/{}/register", base, name))
                .json(&body)
                .send()
                .await?
        }
        Commands::Unregister { name, id } => {
            let mut request = client.delete(format!("{}/gateway/services/{}/unregister", base, name));
            if let Some(id) = id {
                request = request.query(&[("id", id)]);
            }
            request.send().await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
