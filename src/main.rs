//! tilebridge - configuration checking for the dispatch bridge.
//!
//! The crate is primarily a library; this binary validates configuration
//! files the same way `Cache::open` would, without needing an engine.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tilebridge::arena::Arena;
use tilebridge::config::{ConfigLoader, JsonConfigLoader};
use tilebridge::lock::{ProcessLock, DEFAULT_LOCK_PATH};

#[derive(Parser, Debug)]
#[command(name = "tilebridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a configuration file and report what it defines.
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Path to the configuration file.
    #[arg(env = "TILEBRIDGE_CONFIG")]
    config: PathBuf,

    /// Also verify that the lock file path is creatable and lockable.
    #[arg(long, default_value_t = false)]
    check_lock: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Check(args) => run_check(args),
    }
}

// =============================================================================
// Check Command
// =============================================================================

fn run_check(args: CheckArgs) -> ExitCode {
    init_logging(args.verbose);

    println!("tilebridge configuration check");
    println!("══════════════════════════════");
    println!();

    let loader = JsonConfigLoader::new();
    let arena = Arena::new("check");

    let mut tree = match loader.parse(&args.config, &arena) {
        Ok(tree) => {
            println!("✓ Parsed: {}", args.config.display());
            tree
        }
        Err(e) => {
            println!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };

    match loader.post_configure(&mut tree) {
        Ok(()) => println!("✓ Post-configuration passed"),
        Err(e) => {
            println!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    }

    println!();
    println!("Services: {}", format_list(tree.services()));
    println!("Sources:  {}", tree.sources().len());
    println!("Caches:   {}", tree.caches().len());
    println!("Tilesets: {}", tree.tilesets().len());
    for tileset in tree.tilesets() {
        println!(
            "  {} (source: {}, cache: {})",
            tileset.name, tileset.source, tileset.cache
        );
    }

    let lock_path = tree
        .lock_path()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCK_PATH));
    println!("Lock:     {}", lock_path.display());

    if args.check_lock {
        let mut lock = ProcessLock::new(&lock_path);
        match lock.acquire().and_then(|()| lock.release()) {
            Ok(()) => println!("✓ Lock file is creatable and lockable"),
            Err(e) => {
                println!("✗ {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    println!();
    println!("✓ All checks passed");
    ExitCode::SUCCESS
}

fn format_list(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "tilebridge=debug"
    } else {
        "tilebridge=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
