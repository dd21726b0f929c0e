//! settingsrepo command-line management tool.
//!
//! Provides subcommands for browsing and editing the settings store, settling
//! conflicts against a directory of incoming revisions, and generating /
//! validating configuration files.

mod presenter;
mod style;

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use settingsrepo_core::config::{BackendKind, ConflictMode, RepositoryConfig};
use settingsrepo_core::conflict::{
    ConflictResolver, ResolutionMode, ResolutionStrategy, StoreRevisionSource, StrategyKind,
    UiExecutor,
};
use settingsrepo_core::{GitIndex, IndexSynchronizer, MemoryIndex, PathStore, RepositoryManager};

use crate::presenter::TerminalPresenter;

type Manager = RepositoryManager<Box<dyn IndexSynchronizer>>;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// settingsrepo command-line management tool.
#[derive(Parser, Debug)]
#[command(
    name = "settingsrepo",
    version,
    about = "Inspect and edit a versioned settings repository"
)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Store root, overriding the configuration.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Log level, overriding the configuration.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the entries under a directory.
    List {
        /// Directory path relative to the store root.
        #[arg(default_value = "")]
        prefix: String,

        /// List every file below the prefix instead of direct children.
        #[arg(short, long)]
        recursive: bool,
    },

    /// Print a file's content to stdout.
    Read { path: String },

    /// Store content at a path.
    Write {
        path: String,

        /// Read content from this file instead of stdin.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Delete a file or directory.
    Delete { path: String },

    /// Report whether a path exists.
    Exists { path: String },

    /// Remove the whole store.
    Reset {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Settle conflicts against a directory of incoming revisions.
    Resolve {
        /// Directory holding the incoming revisions, laid out like the store.
        #[arg(long)]
        incoming: PathBuf,

        /// Paths to resolve. Defaults to every file under the incoming directory.
        paths: Vec<String>,

        /// Ask the operator instead of applying a strategy.
        #[arg(short, long)]
        interactive: bool,

        /// Automated strategy: sentinel, keep_current, take_incoming.
        #[arg(short, long)]
        strategy: Option<StrategyKind>,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./settingsrepo.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Init { output } => return cmd_init(output),
        Commands::Validate => return cmd_validate(cli.config.as_deref()),
        _ => {}
    }

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config.repository.root = Some(root);
    }
    if let Some(level) = cli.log_level {
        config.logging.log_level = level;
    }
    config.validate().context("invalid configuration")?;
    init_logging(&config.logging.log_level);

    let manager = open_manager(&config)?;

    match cli.command {
        Commands::List { prefix, recursive } => cmd_list(&manager, &prefix, recursive),
        Commands::Read { path } => cmd_read(&manager, &path),
        Commands::Write { path, file } => cmd_write(&manager, &path, file.as_deref()),
        Commands::Delete { path } => cmd_delete(&manager, &path),
        Commands::Exists { path } => {
            println!("{}", manager.exists(&path));
            Ok(())
        }
        Commands::Reset { yes } => cmd_reset(&manager, yes),
        Commands::Resolve {
            incoming,
            paths,
            interactive,
            strategy,
        } => {
            if let Some(strategy) = strategy {
                config.conflicts.strategy = strategy;
            }
            if interactive {
                config.conflicts.mode = ConflictMode::Interactive;
            }
            cmd_resolve(&manager, &config, incoming, paths)
        }
        Commands::Init { .. } | Commands::Validate => unreachable!(),
    }
}

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<RepositoryConfig> {
    let mut config = match path {
        Some(path) => {
            RepositoryConfig::load_from_file(path).context("failed to load configuration file")?
        }
        None => RepositoryConfig::default(),
    };
    config
        .resolve_env_vars()
        .context("failed to resolve environment variables")?;
    Ok(config)
}

fn open_manager(config: &RepositoryConfig) -> Result<Manager> {
    let root = config
        .repository
        .resolved_root()
        .context("failed to determine store root")?;

    let index: Box<dyn IndexSynchronizer> = match config.repository.backend {
        BackendKind::Git => {
            Box::new(GitIndex::open_or_init(&root).context("failed to open git index")?)
        }
        BackendKind::Memory => Box::new(MemoryIndex::default()),
    };
    debug!(root = %root.display(), backend = ?config.repository.backend, "opened repository");

    Ok(RepositoryManager::new(root, index))
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_list(manager: &Manager, prefix: &str, recursive: bool) -> Result<()> {
    let entries = if recursive {
        manager.store().walk_files(prefix)
    } else {
        manager.list_children(prefix)
    }
    .context("failed to list entries")?;

    for entry in entries {
        println!("{}", entry);
    }
    Ok(())
}

fn cmd_read(manager: &Manager, path: &str) -> Result<()> {
    let content = manager
        .read(path)
        .context("failed to read entry")?
        .ok_or_else(|| anyhow::anyhow!("no file at '{}'", path))?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&content).context("failed to write to stdout")?;
    stdout.flush()?;
    Ok(())
}

fn cmd_write(manager: &Manager, path: &str, file: Option<&Path>) -> Result<()> {
    let content = match file {
        Some(file) => std::fs::read(file)
            .with_context(|| format!("failed to read {}", file.display()))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    manager.write(path, &content, content.len());

    // Write failures are logged rather than returned, so check the result.
    match manager.read(path).context("failed to verify write")? {
        Some(stored) if stored == content => {
            println!("{}", style::success(&format!("wrote {} ({} bytes)", path, content.len())));
            Ok(())
        }
        _ => anyhow::bail!("write to '{}' did not reach the store", path),
    }
}

fn cmd_delete(manager: &Manager, path: &str) -> Result<()> {
    if !manager.exists(path) {
        println!("{}", style::dim(&format!("nothing at {}", path)));
        return Ok(());
    }

    manager.delete(path);

    if manager.exists(path) {
        anyhow::bail!("failed to delete '{}'", path);
    }
    println!("{}", style::success(&format!("deleted {}", path)));
    Ok(())
}

fn cmd_reset(manager: &Manager, yes: bool) -> Result<()> {
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Remove everything under {}?",
                manager.root().display()
            ))
            .default(false)
            .interact()
            .context("failed to read confirmation")?;

        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    manager.delete_all().context("failed to reset store")?;
    println!("{}", style::success("store removed"));
    Ok(())
}

fn cmd_resolve(
    manager: &Manager,
    config: &RepositoryConfig,
    incoming: PathBuf,
    paths: Vec<String>,
) -> Result<()> {
    let source = StoreRevisionSource::new(manager, PathStore::new(incoming));
    let paths = if paths.is_empty() {
        source.pending().context("failed to scan incoming revisions")?
    } else {
        paths
    };

    if paths.is_empty() {
        println!("No conflicts to resolve.");
        return Ok(());
    }

    let resolver = match config.conflicts.mode {
        ConflictMode::Automated => {
            ConflictResolver::new(ResolutionMode::Automated(config.conflicts.build_strategy()))
        }
        ConflictMode::Interactive => {
            let executor =
                UiExecutor::spawn("settingsrepo-ui").context("failed to start merge thread")?;
            ConflictResolver::interactive(Arc::new(TerminalPresenter), Arc::new(executor))
        }
    };

    let resolved = resolver
        .resolve(&paths, &source)
        .context("conflict resolution failed")?;

    println!();
    println!("{}", style::header("Resolution summary"));
    for path in &paths {
        if resolved.contains(path) {
            println!("  {}", style::success(path));
        } else {
            println!("  {}", style::warn(&format!("{} (unresolved)", path)));
        }
    }
    println!();
    println!("{} of {} path(s) resolved", resolved.len(), paths.len());

    Ok(())
}

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, RepositoryConfig::default_template())
        .context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Set repository.root if the platform default does not suit you");
    println!(
        "  2. Validate with: settingsrepo validate --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: Option<&Path>) -> Result<()> {
    match config_path {
        Some(path) => println!("Validating configuration: {}", path.display()),
        None => println!("Validating built-in defaults"),
    }
    println!();

    let config = match config_path {
        Some(path) => {
            RepositoryConfig::load_from_file(path).context("failed to parse configuration")?
        }
        None => RepositoryConfig::default(),
    };
    println!("  [OK] TOML structure is valid");

    let mut config = config;
    let _ = config.resolve_env_vars();
    println!("  [OK] Environment overrides processed");

    match config.validate() {
        Ok(()) => println!("  [OK] All fields are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    let root = config
        .repository
        .resolved_root()
        .context("failed to determine store root")?;

    println!();
    println!("Configuration summary:");
    println!("  Store root    : {}", root.display());
    println!("  Index backend : {:?}", config.repository.backend);
    println!("  Conflict mode : {:?}", config.conflicts.mode);
    println!(
        "  Strategy      : {}",
        config.conflicts.build_strategy().name()
    );
    println!("  Log level     : {}", config.logging.log_level);
    println!();
    println!("Configuration is valid.");

    Ok(())
}
