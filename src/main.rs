//! `superapp` command-line client.
//!
//! Drives the API client and the secure store from a terminal: issue
//! authenticated requests, inspect stored values, manage the token and the
//! search history.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use reqwest::Method;
use serde_json::Value;
use zeroize::Zeroize;

use superapp_client::config::parse_millis;
use superapp_client::{AppState, Body, ClientConfig, RequestOptions, StorageChoice, StorageConfig};

#[derive(Parser, Debug)]
#[command(name = "superapp", version, about = "Super app API and storage client")]
struct Args {
    /// API base URL (overrides SUPERAPP_API_URL / API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Request timeout in milliseconds (overrides SUPERAPP_API_TIMEOUT_MS)
    #[arg(long, global = true)]
    timeout_ms: Option<String>,

    /// Storage backend: auto, local or keychain (overrides SUPERAPP_STORAGE)
    #[arg(long, global = true)]
    storage: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a request and print the JSON payload
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: String,
        /// Path relative to the base URL, e.g. /jobs
        path: String,
        /// JSON request body
        #[arg(long)]
        data: Option<String>,
        /// Extra header as `Name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
    /// Raw key-value storage
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
    /// Stored bearer token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Search history
    History {
        /// Storage key (defaults to search_history)
        #[arg(long)]
        key: Option<String>,
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand, Debug)]
enum StoreAction {
    Get { key: String },
    Set { key: String, value: String },
    Remove { key: String },
    /// Clear the namespace (keychain: reserved keys only)
    Clear,
}

#[derive(Subcommand, Debug)]
enum TokenAction {
    Set { token: String },
    Show,
    Clear,
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    Add { query: String },
    List,
    Remove { query: String },
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    env_logger::init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), String> {
    let client_config = client_config(&args)?;
    let mut storage_config = StorageConfig::from_env().map_err(|e| e.to_string())?;
    if let Some(ref storage) = args.storage {
        storage_config.choice = storage
            .parse::<StorageChoice>()
            .map_err(|e| e.to_string())?;
    }

    let state = AppState::new(client_config, &storage_config)
        .await
        .map_err(|e| format!("Failed to open storage: {}", e))?;

    match args.command {
        Command::Request {
            method,
            path,
            data,
            headers,
        } => request(&state, &method, &path, data.as_deref(), &headers).await,
        Command::Store { action } => store(&state, action),
        Command::Token { action } => token(&state, action),
        Command::History { key, action } => history(&state, key.as_deref(), action),
    }
}

/// Environment config with CLI overrides applied before validation.
fn client_config(args: &Args) -> Result<ClientConfig, String> {
    let timeout = args
        .timeout_ms
        .as_deref()
        .map(|ms| parse_millis("--timeout-ms", ms))
        .transpose()
        .map_err(|e| e.to_string())?;

    ClientConfig::resolve(args.api_url.as_deref(), timeout, |name| {
        std::env::var(name).ok()
    })
    .map_err(|e| e.to_string())
}

async fn request(
    state: &AppState,
    method: &str,
    path: &str,
    data: Option<&str>,
    headers: &[String],
) -> Result<(), String> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| format!("Invalid HTTP method: {}", method))?;
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    let mut options = RequestOptions::new(method, path);
    if let Some(data) = data {
        let body: Value =
            serde_json::from_str(data).map_err(|e| format!("--data is not valid JSON: {}", e))?;
        options = options.body(Body::Json(body));
    }
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| format!("Header must be `Name: value`: {}", header))?;
        options = options.try_header(name, value).map_err(|e| e.message)?;
    }

    match state.api.request::<Value>(options).await {
        Ok(payload) => {
            println!("{}", to_pretty(&payload));
            Ok(())
        }
        Err(err) => Err(serde_json::to_string(&err).unwrap_or(err.message)),
    }
}

fn store(state: &AppState, action: StoreAction) -> Result<(), String> {
    match action {
        StoreAction::Get { key } => match state.store.get_item(&key) {
            Some(value) => println!("{}", value),
            None => return Err(format!("No value for '{}'", key)),
        },
        StoreAction::Set { key, value } => state.store.set_item(&key, &value).map_err(|e| e.to_string())?,
        StoreAction::Remove { key } => state.store.remove_item(&key).map_err(|e| e.to_string())?,
        StoreAction::Clear => {
            state.store.clear_all().map_err(|e| e.to_string())?;
            println!("Cleared {} storage", state.store.kind());
        }
    }
    Ok(())
}

fn token(state: &AppState, action: TokenAction) -> Result<(), String> {
    match action {
        TokenAction::Set { mut token } => {
            let result = state.store.set_token(token.trim());
            token.zeroize();
            result.map_err(|e| e.to_string())?;
        }
        TokenAction::Show => match state.store.get_token() {
            Some(token) => println!("{}", mask(&token)),
            None => println!("No token stored"),
        },
        TokenAction::Clear => state.store.remove_token().map_err(|e| e.to_string())?,
    }
    Ok(())
}

fn history(state: &AppState, key: Option<&str>, action: HistoryAction) -> Result<(), String> {
    let history = state.search_history(key);
    match action {
        HistoryAction::Add { query } => {
            let entries = history.record(&query).map_err(|e| e.to_string())?;
            print_lines(&entries);
        }
        HistoryAction::List => print_lines(&history.entries()),
        HistoryAction::Remove { query } => history.remove(&query).map_err(|e| e.to_string())?,
        HistoryAction::Clear => history.clear().map_err(|e| e.to_string())?,
    }
    Ok(())
}

fn print_lines(entries: &[String]) {
    for entry in entries {
        println!("{}", entry);
    }
}

fn to_pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// First four characters and the length; never the whole token.
fn mask(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{}... ({} chars)", prefix, token.chars().count())
}
