//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{CredVaultError, Result};
use crate::vault::{self, CredentialApi, CredentialKind, CredentialStore, PersistenceClass};

/// CredVault CLI: named credentials in the platform credential vault.
#[derive(Parser)]
#[command(
    name = "credvault",
    about = "Store and retrieve named credentials in the platform credential vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Namespace for unqualified target names (default: from .credvault.toml)
    #[arg(long, env = "CREDVAULT_NAMESPACE", global = true)]
    pub namespace: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// List stored credentials (all of them when no filter is given)
    List {
        /// Target filter; a trailing `*` matches by prefix
        filter: Option<String>,
        /// Only list entries under the configured namespace
        #[arg(long, conflicts_with_all = ["filter", "raw"])]
        mine: bool,
        /// Pass the filter to the vault without namespacing it
        #[arg(long)]
        raw: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one credential
    Show {
        /// Target or user name
        target: String,
        /// Credential kind
        #[arg(short, long, default_value = "generic")]
        kind: CredentialKind,
        /// Use best-match lookup among generic credentials
        #[arg(long, conflicts_with = "kind")]
        best: bool,
        /// Look up the target exactly as given, without namespacing it
        #[arg(long)]
        raw: bool,
        /// Print the secret
        #[arg(long)]
        reveal: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Store a credential (add or replace)
    Set {
        /// Target or user name
        target: String,
        /// User name stored with the secret (default: the target)
        #[arg(short, long)]
        user: Option<String>,
        /// Credential kind
        #[arg(short, long, default_value = "generic")]
        kind: CredentialKind,
        /// Persistence class (default: from .credvault.toml)
        #[arg(short, long)]
        persistence: Option<PersistenceClass>,
        /// Alias stored with the credential
        #[arg(long)]
        alias: Option<String>,
        /// Description stored with the credential
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Remove a credential
    Remove {
        /// Target or user name
        target: String,
        /// Credential kind
        #[arg(short, long, default_value = "generic")]
        kind: CredentialKind,
        /// Remove the target exactly as given, without namespacing it
        #[arg(long)]
        raw: bool,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Exit successfully if any credential matches the filter
    Test {
        /// Target filter
        filter: String,
    },

    /// View the audit log of vault changes
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },
}

// ---------------------------------------------------------------------------
// Shared context
// ---------------------------------------------------------------------------

/// Settings and paths shared by every command.
pub struct Context {
    pub settings: Settings,
    pub cwd: PathBuf,
}

impl Context {
    /// Load `.credvault.toml` from the working directory and apply CLI
    /// overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let mut settings = Settings::load(&cwd)?;
        if let Some(ns) = cli.namespace.as_deref() {
            if ns.is_empty() || ns.contains(':') {
                return Err(CredVaultError::ConfigError(format!(
                    "namespace '{ns}' must be non-empty and must not contain ':'"
                )));
            }
            settings.namespace = ns.to_string();
        }
        Ok(Self { settings, cwd })
    }

    pub fn state_dir(&self) -> PathBuf {
        self.settings.state_path(&self.cwd)
    }
}

/// Install the stderr log subscriber. Level comes from `CREDVAULT_LOG`
/// (default `warn`).
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_env("CREDVAULT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Run the parsed command line.
pub fn run(cli: &Cli) -> Result<()> {
    let ctx = Context::load(cli)?;

    match cli.command {
        Commands::Audit { last, ref since } => {
            commands::audit_cmd::execute(&ctx, last, since.as_deref())
        }
        Commands::Completions { ref shell } => commands::completions::execute(shell),
        ref command => {
            let store = vault::platform_store(ctx.settings.resolver())?;
            run_vault_command(&ctx, &store, command)
        }
    }
}

/// Dispatch a command that talks to the vault.
pub fn run_vault_command<A: CredentialApi>(
    ctx: &Context,
    store: &CredentialStore<A>,
    command: &Commands,
) -> Result<()> {
    match command {
        Commands::List {
            filter,
            mine,
            raw,
            json,
        } => {
            let filter = if *mine {
                store.resolver().namespace_filter()
            } else {
                filter.clone().unwrap_or_default()
            };
            commands::list::execute(store, &filter, *raw, *json)
        }
        Commands::Show {
            target,
            kind,
            best,
            raw,
            reveal,
            json,
        } => commands::show::execute(
            store,
            target,
            commands::show::ShowOptions {
                kind: *kind,
                best: *best,
                raw: *raw,
                reveal: *reveal,
                json: *json,
            },
        ),
        Commands::Set {
            target,
            user,
            kind,
            persistence,
            alias,
            description,
        } => commands::set::execute(
            ctx,
            store,
            target,
            commands::set::SetOptions {
                user: user.as_deref(),
                kind: *kind,
                persistence: persistence.unwrap_or(ctx.settings.default_persistence),
                alias: alias.as_deref(),
                description: description.as_deref(),
            },
        ),
        Commands::Remove {
            target,
            kind,
            raw,
            force,
        } => commands::remove::execute(ctx, store, target, *kind, *raw, *force),
        Commands::Test { filter } => commands::test::execute(store, filter),
        Commands::Audit { .. } | Commands::Completions { .. } => Err(
            CredVaultError::CommandFailed("command does not use the vault".into()),
        ),
    }
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Get the secret to store, trying in order:
/// 1. `CREDVAULT_SECRET` env var (CI/CD)
/// 2. Piped stdin
/// 3. Interactive prompt
///
/// Returns `Zeroizing<String>` so the secret is wiped from memory on drop.
pub fn read_secret(target: &str) -> Result<Zeroizing<String>> {
    if let Ok(secret) = std::env::var("CREDVAULT_SECRET") {
        if !secret.is_empty() {
            return Ok(Zeroizing::new(secret));
        }
    }

    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim_end_matches(['\r', '\n']).len();
        buf.truncate(trimmed);
        return Ok(buf);
    }

    let secret = dialoguer::Password::new()
        .with_prompt(format!("Enter secret for {target}"))
        .allow_empty_password(true)
        .interact()
        .map_err(|e| CredVaultError::CommandFailed(format!("secret prompt: {e}")))?;
    Ok(Zeroizing::new(secret))
}
