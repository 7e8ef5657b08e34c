use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use prettytable::{Cell, Row, Table};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_API_URL: &str = "http://localhost:3000";
const PREVIEW_CHARS: usize = 40;

#[derive(Parser)]
#[command(name = "wifto")]
#[command(about = "A CLI client for the quiz upload backend", long_about = None)]
struct Cli {
    #[arg(long, global = true, default_value = DEFAULT_API_URL, help = "Backend base URL")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create a new account")]
    Register {
        #[arg(short, long, help = "Username")]
        username: String,

        #[arg(short, long, help = "Password")]
        password: String,
    },

    #[command(about = "Check your credentials")]
    Login {
        #[arg(short, long, help = "Username")]
        username: String,

        #[arg(short, long, help = "Password")]
        password: String,
    },

    #[command(about = "Upload a file, an image or a text snippet")]
    Upload {
        #[arg(short, long, help = "Path to a file or image")]
        file: Option<PathBuf>,

        #[arg(short, long, help = "Text snippet")]
        text: Option<String>,

        #[arg(short, long, help = "Label to record as the uploader")]
        by: Option<String>,
    },

    #[command(about = "List all uploads, newest first")]
    List,
}

#[derive(Debug, Serialize)]
struct CredentialsRequest {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    username: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Upload {
    kind: String,
    display_name: Option<String>,
    location_ref: Option<String>,
    text: Option<String>,
    uploaded_by: String,
    created_at: DateTime<Utc>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let api = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Register { username, password } => register(&api, username, password).await,
        Commands::Login { username, password } => login(&api, username, password).await,
        Commands::Upload { file, text, by } => upload(&api, file, text, by).await,
        Commands::List => list_uploads(&api).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn register(api: &str, username: String, password: String) -> anyhow::Result<()> {
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/register", api))
        .json(&CredentialsRequest {
            username: username.clone(),
            password,
        })
        .send()
        .await?;

    if !response.status().is_success() {
        anyhow::bail!("Registration failed: {}", error_message(response).await);
    }

    println!("✅ Account created successfully!");
    println!("👤 Username: {}", username);

    Ok(())
}

async fn login(api: &str, username: String, password: String) -> anyhow::Result<()> {
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/login", api))
        .json(&CredentialsRequest { username, password })
        .send()
        .await?;

    if !response.status().is_success() {
        anyhow::bail!("Login failed: {}", error_message(response).await);
    }

    let result: LoginResponse = response.json().await?;
    println!("✅ Login successful!");
    println!("👤 Welcome back, {}!", result.username);

    Ok(())
}

async fn upload(
    api: &str,
    file: Option<PathBuf>,
    text: Option<String>,
    by: Option<String>,
) -> anyhow::Result<()> {
    if file.is_none() && text.is_none() {
        anyhow::bail!("Provide --file or --text");
    }

    let mut form = Form::new();

    if let Some(path) = &file {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let content_type = mime_guess::from_path(path).first_or_octet_stream();

        let part = Part::bytes(data)
            .file_name(file_name)
            .mime_str(content_type.as_ref())?;
        form = form.part("file", part);
    }

    if let Some(text) = text {
        form = form.text("text", text);
    }

    if let Some(by) = by {
        form = form.text("uploadedBy", by);
    }

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/api/upload", api))
        .multipart(form)
        .send()
        .await?;

    if !response.status().is_success() {
        anyhow::bail!("Upload failed: {}", error_message(response).await);
    }

    println!("✅ Upload stored!");
    if let Some(path) = file {
        println!("📄 File: {}", path.display());
    }

    Ok(())
}

async fn list_uploads(api: &str) -> anyhow::Result<()> {
    let client = reqwest::Client::new();

    let response = client.get(format!("{}/api/uploads", api)).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to fetch uploads: {}", error_message(response).await);
    }

    let uploads: Vec<Upload> = response.json().await?;

    if uploads.is_empty() {
        println!("📭 No uploads yet.");
        return Ok(());
    }

    println!("\n📋 Uploads ({})\n", uploads.len());

    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Kind"),
        Cell::new("Content"),
        Cell::new("By"),
        Cell::new("Uploaded"),
    ]));

    for upload in uploads {
        let content = match (&upload.display_name, &upload.location_ref, &upload.text) {
            (Some(name), Some(location), _) => format!("{} ({}{})", name, api, location),
            (_, _, Some(text)) => preview(text),
            _ => "-".to_string(),
        };
        let local_time = upload.created_at.with_timezone(&Local);

        table.add_row(Row::new(vec![
            Cell::new(&upload.kind),
            Cell::new(&content),
            Cell::new(&upload.uploaded_by),
            Cell::new(&local_time.format("%Y-%m-%d %H:%M:%S").to_string()),
        ]));
    }

    table.printstd();
    println!();

    Ok(())
}

async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
