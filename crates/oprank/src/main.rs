use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use oprank_connect::{SetupError, build_provider};
use oprank_core::config::{self, CONFIG_PATH_ENV, ConfigError, SAMPLE_CONFIG};
use oprank_core::{OnePasswordProvider, ResolveError, SecretReference, SecretValue, VaultOrderIndex};
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "oprank", version, about = "Resolve 1Password secrets across ranked vaults")]
struct Cli {
    /// Store config path (otherwise OPRANK_CONFIG or ~/.oprank/config.toml).
    #[arg(long, global = true, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Print one secret value to stdout.
    Get {
        /// Item title to look up.
        key: String,

        /// Field label, or file name for documents (default: password / first file).
        #[arg(long, short = 'p', default_value = "")]
        property: String,
    },
    /// Print every field (or file) of an item as a JSON object.
    Map {
        /// Item title to look up.
        key: String,
    },
    /// Check that every configured vault can be listed.
    Validate,
    /// Show the vault precedence order.
    Vaults,
    /// Write a sample store config.
    Init {
        /// Overwrite existing config file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("config already exists at {0} (use --force to overwrite)")]
    ConfigExists(String),

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("value of '{0}' is not valid UTF-8; read it with `oprank get`")]
    NotUtf8(String),

    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("oprank: {e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout only ever carries command output.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let path = cli.config.unwrap_or_else(config::config_path);

    match cli.cmd {
        Cmd::Init { force } => {
            println!("{}", run_init_at(&path, force)?);
        }
        Cmd::Vaults => {
            let store = config::load_config(&path)?;
            print!("{}", render_vaults(&VaultOrderIndex::new(&store.vaults)));
        }
        Cmd::Get { key, property } => {
            let provider = connect(&path)?;
            let value = provider
                .get_secret(&SecretReference::new(key).with_property(property))
                .await?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(value.as_bytes())?;
            stdout.flush()?;
        }
        Cmd::Map { key } => {
            let provider = connect(&path)?;
            let values = provider.get_secret_map(&SecretReference::new(key)).await?;
            println!("{}", render_map(&values)?);
        }
        Cmd::Validate => {
            let provider = connect(&path)?;
            provider.validate().await?;
            println!("ok: {} vault(s) reachable", provider.vault_order().len());
        }
    }
    Ok(())
}

fn connect(path: &Path) -> Result<OnePasswordProvider, CliError> {
    debug!(path = %path.display(), "loading store config");
    let store = config::load_config(path)?;
    Ok(build_provider(&store)?)
}

fn run_init_at(path: &Path, force: bool) -> Result<String, CliError> {
    if path.exists() && !force {
        return Err(CliError::ConfigExists(path.display().to_string()));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| CliError::Write {
            path: parent.display().to_string(),
            source,
        })?;
    }
    std::fs::write(path, SAMPLE_CONFIG).map_err(|source| CliError::Write {
        path: path.display().to_string(),
        source,
    })?;

    Ok(format!(
        "wrote {}\n  add your vaults under [vaults], then run `oprank validate`",
        path.display()
    ))
}

/// One `rank<TAB>name` line per vault, in visiting order.
fn render_vaults(order: &VaultOrderIndex) -> String {
    order
        .specs()
        .iter()
        .map(|spec| format!("{}\t{}\n", spec.rank, spec.name))
        .collect()
}

/// Render a secret map as a JSON object with sorted keys.
fn render_map(values: &HashMap<String, SecretValue>) -> Result<String, CliError> {
    let mut out = BTreeMap::new();
    for (label, value) in values {
        let text = value
            .as_str()
            .ok_or_else(|| CliError::NotUtf8(label.clone()))?;
        out.insert(label.as_str(), text);
    }
    Ok(serde_json::to_string_pretty(&out)?)
}
