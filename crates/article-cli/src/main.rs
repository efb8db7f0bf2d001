use clap::{Parser, Subcommand};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "articles")]
#[command(about = "A CLI for managing articles")]
struct Cli {
    /// Base URL for the article service
    #[arg(long, default_value = "http://localhost:3000")]
    service_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every article
    List,
    /// Show one article
    Get { id: i32 },
    /// Create an article
    Create {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        content: String,
        /// Publish the article right away
        #[arg(short, long)]
        published: bool,
    },
    /// Replace an article's title and content
    Update {
        id: i32,
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        content: String,
        /// Leave unset to keep the current flag
        #[arg(short, long)]
        published: Option<bool>,
    },
    /// Delete an article
    Delete { id: i32 },
}

#[derive(Serialize)]
struct ArticlePayload {
    title: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    published: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();
    let client = Client::new();
    let base = cli.service_url.trim_end_matches('/');

    let request = match cli.command {
        Commands::List => client.get(format!("{base}/article")),
        Commands::Get { id } => client.get(format!("{base}/article/{id}")),
        Commands::Create {
            title,
            content,
            published,
        } => client.post(format!("{base}/article")).json(&ArticlePayload {
            title,
            content,
            published: Some(published),
        }),
        Commands::Update {
            id,
            title,
            content,
            published,
        } => client
            .put(format!("{base}/article/{id}"))
            .json(&ArticlePayload {
                title,
                content,
                published,
            }),
        Commands::Delete { id } => client.delete(format!("{base}/article/{id}")),
    };

    send(request).await
}

async fn send(request: RequestBuilder) -> Result<ExitCode, Box<dyn Error>> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;

    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{rendered}");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("Request failed: {status}");
        eprintln!("Response: {rendered}");
        Ok(ExitCode::FAILURE)
    }
}
