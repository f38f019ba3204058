use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use grf_loader::grf::config::format_grfid;
use grf_loader::{GrfConfig, GrfStringTable, Loader, LoaderConfig, RecordingSpriteCache};

#[derive(Parser)]
#[command(name = "grfload")]
#[command(about = "Scan and load extension content files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a file's identity without loading it
    Scan { file: String },
    /// Run a full load session over the configured files
    Load {
        /// JSON loader configuration
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("grfload")
        .join("config.json")
}

fn describe(config: &GrfConfig) -> Value {
    json!({
        "file": config.filename,
        "grfid": format_grfid(config.ident.grfid),
        "checksum": format!("{:08x}", config.ident.checksum),
        "version": config.version,
        "name": config.name,
        "description": config.info,
        "status": config.status,
        "flags": format!("{:?}", config.flags),
        "error": config.error,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Scan { file } => {
            let loader = Loader::default();
            let config = loader.scan_file(&file)?;
            println!("{}", serde_json::to_string_pretty(&describe(&config))?);
        }
        Commands::Load { config } => {
            let path = config.unwrap_or_else(default_config_path);
            let loader_config = LoaderConfig::from_path(&path)?;
            let mut loader = Loader::new(
                &loader_config,
                Box::new(RecordingSpriteCache::new()),
                Box::new(GrfStringTable::new()),
            );
            loader.load();

            let ctx = loader.context();
            let report = json!({
                "files": loader.configs().iter().map(describe).collect::<Vec<_>>(),
                "images_loaded": ctx.spriteid - ctx.sprite_base,
                "sounds": ctx.tables.sounds.len(),
                "houses": ctx.tables.houses.len(),
                "station_classes": ctx.tables.station_classes.len(),
                "strings_remapped": loader.string_remap().len(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
