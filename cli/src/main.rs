use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(
    name = "collabverse-cli",
    version,
    about = "Browse and import CollabVerse listings"
)]
struct Cli {
    /// Base URL of the CollabVerse server.
    #[arg(long, default_value = "http://localhost:3000")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List research projects.
    Projects(ListingArgs),
    /// List funding opportunities.
    Funding(ListingArgs),
    /// List projects looking for a mentor.
    Mentorship(ListingArgs),
    /// Create the projects and funding posts described in a JSON file.
    Import {
        file: PathBuf,
        /// Bearer token of the owner the records are created for.
        #[arg(long)]
        token: String,
    },
}

#[derive(Args, Debug, Default)]
struct ListingArgs {
    #[arg(long)]
    category: Option<String>,
    /// Free-text search over title, description and tags.
    #[arg(long, short)]
    query: Option<String>,
    /// relevance, recent, popular or collaborators.
    #[arg(long)]
    sort: Option<String>,
    #[arg(long)]
    open_to_collaborators: bool,
    #[arg(long)]
    funding_available: bool,
    #[arg(long)]
    seeking_mentorship: bool,
    #[arg(long)]
    remote_ok: bool,
    /// Print the raw JSON response.
    #[arg(long)]
    json: bool,
}

impl ListingArgs {
    fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(category) = &self.category {
            params.push(("category", category.clone()));
        }
        if let Some(query) = &self.query {
            params.push(("q", query.clone()));
        }
        if let Some(sort) = &self.sort {
            params.push(("sort", sort.clone()));
        }
        for (flag, name) in [
            (self.open_to_collaborators, "open_to_collaborators"),
            (self.funding_available, "funding_available"),
            (self.seeking_mentorship, "seeking_mentorship"),
            (self.remote_ok, "remote_ok"),
        ] {
            if flag {
                params.push((name, "true".to_string()));
            }
        }
        params
    }
}

/// Contents of an import file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImportFile {
    projects: Vec<Value>,
    funding: Vec<Value>,
}

fn read_import_file(path: &Path) -> Result<ImportFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: ImportFile = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid import file", path.display()))?;
    if file.projects.is_empty() && file.funding.is_empty() {
        bail!("{} contains no projects or funding posts", path.display());
    }
    Ok(file)
}

fn text<'a>(item: &'a Value, key: &str) -> &'a str {
    item.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// One line per listed record.
fn format_item(item: &Value) -> String {
    let category = match text(item, "projectCategory") {
        "" => text(item, "category"),
        other => other,
    };
    format!(
        "{}/{}  {}  [{}]",
        text(item, "ownerId"),
        text(item, "recordId"),
        text(item, "title"),
        category
    )
}

async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or_default();
    match body.get("error").and_then(Value::as_str) {
        Some(message) => format!("{status}: {message}"),
        None => status.to_string(),
    }
}

async fn list(client: &reqwest::Client, server: &str, path: &str, args: ListingArgs) -> Result<()> {
    let response = client
        .get(format!("{server}/api/v1/{path}"))
        .query(&args.query_params())
        .send()
        .await
        .context("Failed to reach the server")?;
    if !response.status().is_success() {
        bail!("Listing failed: {}", error_message(response).await);
    }
    let body: Value = response.json().await.context("Invalid listing response")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }
    let items = body.get("items").and_then(Value::as_array).cloned().unwrap_or_default();
    for item in &items {
        println!("{}", format_item(item));
    }
    println!("{} result(s)", items.len());
    Ok(())
}

async fn import(client: &reqwest::Client, server: &str, file: &Path, token: &str) -> Result<()> {
    let contents = read_import_file(file)?;
    let batches = [("projects", contents.projects), ("funding", contents.funding)];

    let mut failures = 0;
    for (path, records) in batches {
        for record in records {
            let title = record
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or("<untitled>")
                .to_string();
            let response = client
                .post(format!("{server}/api/v1/{path}"))
                .bearer_auth(token)
                .json(&record)
                .send()
                .await
                .context("Failed to reach the server")?;
            if response.status().is_success() {
                println!("Created {path} record '{title}'");
            } else {
                failures += 1;
                eprintln!("Failed to create '{title}': {}", error_message(response).await);
            }
        }
    }

    if failures > 0 {
        bail!("{failures} record(s) failed to import");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();
    let client = reqwest::Client::new();

    match cli.command {
        Command::Projects(args) => list(&client, &server, "projects", args).await,
        Command::Funding(args) => list(&client, &server, "funding", args).await,
        Command::Mentorship(args) => list(&client, &server, "mentorship", args).await,
        Command::Import { file, token } => import(&client, &server, &file, &token).await,
    }
}
