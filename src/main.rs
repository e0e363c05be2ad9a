//! webpush CLI - send encrypted Web Push messages from the command line.
//!
//! This is the main binary entry point. See the `webpush` library for the
//! core functionality.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use webpush::{
    Config, PushSubscription, SendOptions, Urgency, VapidKeys, WebPushClient, WebPushError,
};

#[derive(Parser)]
#[command(name = "webpush")]
#[command(version)]
#[command(about = "Send encrypted Web Push notifications with VAPID")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a VAPID keypair and print it as JSON
    GenerateKeys {
        /// Store the keys in the configuration file
        #[arg(long)]
        save: bool,
        /// VAPID subject to store alongside the keys (mailto: or https:)
        #[arg(long)]
        subject: Option<String>,
    },
    /// Send one message to a subscription
    Send {
        /// File holding the browser's PushSubscription JSON
        #[arg(long)]
        subscription: PathBuf,
        /// Message payload (omit for a payload-less tickle)
        #[arg(long)]
        payload: Option<String>,
        /// Seconds the push service keeps the message for an offline device
        #[arg(long)]
        ttl: Option<u32>,
        /// Delivery urgency: very-low, low, normal, high
        #[arg(long)]
        urgency: Option<Urgency>,
        /// Replace any pending message with the same topic
        #[arg(long)]
        topic: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::GenerateKeys { save, subject } => generate_keys(cli.config, save, subject),
        Commands::Send {
            subscription,
            payload,
            ttl,
            urgency,
            topic,
        } => {
            let mut options = SendOptions::new();
            options.ttl = ttl;
            options.urgency = urgency;
            options.topic = topic;
            send(cli.config, &subscription, payload.as_deref().unwrap_or_default(), &options).await
        }
    }
}

fn generate_keys(config_path: Option<PathBuf>, save: bool, subject: Option<String>) -> Result<()> {
    let keys = VapidKeys::generate();
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "publicKey": keys.public_key_base64url(),
            "privateKey": keys.private_key_base64url(),
        }))?
    );

    if save {
        let path = match config_path {
            Some(path) => path,
            None => Config::default_path()?,
        };
        let mut config = Config::load(Some(&path))?;
        config.vapid_public_key = Some(keys.public_key_base64url().to_string());
        config.vapid_private_key = Some(keys.private_key_base64url().to_string());
        if subject.is_some() {
            config.vapid_subject = subject;
        }
        config.save(&path)?;
        eprintln!("Saved VAPID keys to {}", path.display());
    }

    Ok(())
}

async fn send(
    config_path: Option<PathBuf>,
    subscription_path: &Path,
    payload: &str,
    options: &SendOptions,
) -> Result<()> {
    let config = Config::load(config_path.as_deref())?;
    let client = WebPushClient::from_config(&config).context("Invalid configuration")?;

    let json = fs::read_to_string(subscription_path)
        .with_context(|| format!("Failed to read {}", subscription_path.display()))?;
    let subscription = PushSubscription::from_json(&json)?;

    match client.send(&subscription, payload.as_bytes(), options).await {
        Ok(()) => {
            println!("Delivered to {}", subscription.audience());
            Ok(())
        }
        Err(WebPushError::Push(err)) if err.is_subscription_gone() => {
            anyhow::bail!("{err} ({}): remove this subscription", err.status)
        }
        Err(err) => Err(err.into()),
    }
}
