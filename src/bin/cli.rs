//! Twinlog CLI
//!
//! Command-line interface over a single database file.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use twinlog::{Config, Engine, Key, StoreMode};

/// Twinlog CLI
#[derive(Parser, Debug)]
#[command(name = "twinlog-cli")]
#[command(about = "CLI for the Twinlog embedded key-value store")]
#[command(version)]
struct Args {
    /// Value log path (the index log is <path>.idx)
    #[arg(short, long, default_value = "./twinlog_data/db")]
    path: String,

    /// Store mode: 0 = disk, 2 = memory
    #[arg(short = 'm', long, default_value = "0")]
    store_mode: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// List keys in order (a trailing `*` on --from makes it a prefix)
    Keys {
        /// Start after this key
        #[arg(short, long)]
        from: Option<String>,

        /// Maximum number of keys (0 = all)
        #[arg(short, long, default_value = "0")]
        limit: usize,

        /// Keys to skip
        #[arg(short, long, default_value = "0")]
        offset: usize,

        /// Walk from the largest key down
        #[arg(short, long)]
        desc: bool,
    },

    /// Print the number of live keys
    Count,

    /// Copy the database under a destination directory
    Backup {
        /// Destination root
        dest: String,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,twinlog=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> twinlog::Result<()> {
    let config = Config::builder()
        .path(&args.path)
        .store_mode(StoreMode::try_from(args.store_mode)?)
        .build();
    let engine = Engine::open(config)?;

    match args.command {
        Commands::Get { key } => {
            let value = engine.get(key)?;
            println!("{}", String::from_utf8_lossy(&value));
        }
        Commands::Set { key, value } => engine.set(key, value)?,
        Commands::Del { key } => engine.delete(key)?,
        Commands::Keys {
            from,
            limit,
            offset,
            desc,
        } => {
            for key in engine.keys(from.map(Key::from), limit, offset, !desc)? {
                println!("{}", String::from_utf8_lossy(&key));
            }
        }
        Commands::Count => println!("{}", engine.count()?),
        Commands::Backup { dest } => {
            let target = engine.backup(std::path::Path::new(&dest))?;
            println!("{}", target.display());
        }
    }

    engine.close()
}
