use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};

use rusbit_metainfo::config::{Config, DEFAULT_CONFIG_PATH};
use rusbit_metainfo::{decode_file_with, dict_to_json, dump_dict, extract_metadata, DecodeMode};

#[derive(Parser)]
#[command(name = "rusbit-metainfo", version, about = "Inspect .torrent metainfo files")]
struct Cli {
    /// Config file with decoder settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Tolerate malformed input instead of failing
    #[arg(long, global = true)]
    relaxed: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the decoded bencode tree as JSON
    Decode { file: PathBuf },
    /// Print the torrent's metadata
    Info {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print the decoded tree, one entry per line
    Dump { file: PathBuf },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config = Config::load(&config_path)
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("loading config {}", config_path.display()))?;
    if cli.relaxed {
        config.mode = DecodeMode::Relaxed;
    }
    debug!("Using {:?}", config);
    let options = config.decode_options();

    match cli.command {
        Command::Decode { file } => {
            let dict = decode_file_with(&file, options)
                .with_context(|| format!("decoding {}", file.display()))?;
            println!("{}", serde_json::to_string(&dict_to_json(&dict))?);
        }
        Command::Info { file, json } => {
            let dict = decode_file_with(&file, options)
                .with_context(|| format!("decoding {}", file.display()))?;
            let metadata = extract_metadata(dict);
            info!("Extracted metadata for {}", metadata.name);
            if json {
                println!("{}", serde_json::to_string_pretty(&metadata)?);
            } else {
                println!("Info Length: {} bytes", metadata.info_bytes().len());
                println!("{}", metadata);
            }
        }
        Command::Dump { file } => {
            let dict = decode_file_with(&file, options)
                .with_context(|| format!("decoding {}", file.display()))?;
            print!("{}", dump_dict(&dict));
        }
    }

    Ok(())
}
