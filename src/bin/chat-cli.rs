use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "chat-cli")]
#[command(about = "Operator CLI for the MCP chat service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8085")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show service health and circuit breaker state
    Health,
    /// Send one chat message
    Chat {
        message: String,

        /// Continue an existing session
        #[arg(short, long)]
        session_id: Option<String>,

        /// JSON file holding the conversation history array
        #[arg(long)]
        history_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Chat {
            message,
            session_id,
            history_file,
        } => {
            let history = match history_file {
                Some(path) => serde_json::from_str::<Value>(&std::fs::read_to_string(path)?)?,
                None => json!([]),
            };
            let mut body = json!({
                "message": message,
                "conversationHistory": history,
            });
            if let Some(id) = session_id {
                body["sessionId"] = Value::String(id);
            }

            let res = client.post(format!("{}/chat", base)).json(&body).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: chat service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
