use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use sentinel_auth::{
    auth::keys::generate_signing_key_with_size, config::Settings, AuthError, PasswordHasher,
    SystemClock, TokenIssuer, TokenKind, TokenVerifier,
};

/// Operator tooling for the Sentinel authentication core
#[derive(Parser, Debug)]
#[command(name = "sentinel", version, about)]
struct Cli {
    /// TOML config file (defaults to ./sentinel.toml plus SENTINEL_* env vars)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a fresh random signing key
    GenKey {
        /// Bytes of entropy
        #[arg(long, default_value_t = 48)]
        bytes: usize,
    },
    /// Hash a password read from stdin
    HashPassword,
    /// Check a password read from stdin against a stored hash
    VerifyPassword {
        /// PHC-format hash
        #[arg(long)]
        hash: String,
    },
    /// Issue a signed token for a subject
    Issue {
        #[arg(long)]
        subject: String,
        #[arg(long, default_value = "access")]
        kind: TokenKind,
    },
    /// Verify a token and print its claims
    Inspect {
        token: String,
        #[arg(long, default_value = "access")]
        kind: TokenKind,
    },
    /// Load and validate configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Key generation must work before any config exists
    if let Command::GenKey { bytes } = cli.command {
        println!("{}", generate_signing_key_with_size(bytes));
        return Ok(());
    }

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .context("failed to load configuration")?;

    init_tracing(&settings.log_level, cli.json_logs);

    match cli.command {
        Command::GenKey { .. } => unreachable!("handled before loading configuration"),
        Command::HashPassword => {
            let password = read_password()?;
            let hasher = Arc::new(PasswordHasher::new(&settings.password)?);
            let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
                .await
                .map_err(AuthError::from)??;
            println!("{hash}");
        },
        Command::VerifyPassword { hash } => {
            let password = read_password()?;
            let hasher = Arc::new(PasswordHasher::new(&settings.password)?);
            let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
                .await
                .map_err(AuthError::from)?;
            if !matches {
                return Err(anyhow!("password does not match"));
            }
            println!("password matches");
        },
        Command::Issue { subject, kind } => {
            let issuer = TokenIssuer::from_settings(&settings.tokens, Arc::new(SystemClock))?;
            println!("{}", issuer.issue(&subject, kind)?);
        },
        Command::Inspect { token, kind } => {
            let verifier = TokenVerifier::from_settings(&settings.tokens, Arc::new(SystemClock))?;
            let claims = verifier
                .verify(&token, kind)
                .map_err(|e| anyhow!("{e} ({})", e.error_code()))?;
            println!("{}", serde_json::to_string_pretty(&claims)?);
        },
        Command::CheckConfig => {
            info!(?settings, "configuration loaded");
            println!("{settings:#?}");
            println!("configuration OK");
        },
    }

    Ok(())
}

/// Logs go to stderr so command output on stdout stays pipeable
fn init_tracing(default_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_password() -> anyhow::Result<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let password = Zeroizing::new(line.trim_end_matches(['\r', '\n']).to_string());
    if password.is_empty() {
        return Err(anyhow!("empty password"));
    }
    Ok(password)
}
