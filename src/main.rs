// SPDX-License-Identifier: MIT

use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use hidrecon::dump::{describe, hex_string};
use hidrecon::finder::{find_descriptors, FinderConfig};
use hidrecon::{Assembler, CapabilitySnapshot, DEFAULT_INITIAL_CAPACITY};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Reconstruct a report descriptor from a YAML capability snapshot
    Reconstruct {
        /// Path to the capability snapshot
        snapshot: PathBuf,
        /// Initial size of the descriptor buffer in bytes
        #[arg(long, default_value_t = DEFAULT_INITIAL_CAPACITY)]
        initial_capacity: usize,
        /// Also print an annotated listing of the descriptor
        #[arg(long)]
        describe: bool,
    },
    /// Find report descriptors inside a binary file
    Find {
        /// Path to the binary file, e.g. a firmware image
        file: PathBuf,
        /// Shortest candidate in bytes
        #[arg(long, default_value_t = FinderConfig::default().min_len)]
        min_len: usize,
        /// Longest candidate in bytes
        #[arg(long, default_value_t = FinderConfig::default().max_len)]
        max_len: usize,
        /// Minimum share of common item prefixes in a candidate
        #[arg(long, default_value_t = FinderConfig::default().min_score)]
        min_score: f64,
    },
}

fn reconstruct(
    snapshot: PathBuf,
    initial_capacity: usize,
    annotate: bool,
) -> Result<(), Box<dyn Error>> {
    log::debug!("Loading capability snapshot {}", snapshot.display());
    let snapshot = CapabilitySnapshot::from_yaml_file(&snapshot)?;
    let rdesc = Assembler::new()
        .initial_capacity(initial_capacity)
        .assemble(&snapshot)?;

    println!("{}", hex_string(&rdesc));
    if annotate {
        println!("{}", describe(&rdesc)?);
    }

    Ok(())
}

fn find(file: PathBuf, config: FinderConfig) -> Result<(), Box<dyn Error>> {
    let blob = std::fs::read(&file)?;
    log::debug!("Scanning {} bytes of {}", blob.len(), file.display());

    let candidates = find_descriptors(&blob, &config);
    if candidates.is_empty() {
        log::info!("No report descriptor candidates found");
    }
    for candidate in candidates {
        println!("[Offset 0x{:X}]", candidate.offset);
        println!("{}\n", hex_string(candidate.bytes));
    }

    Ok(())
}

fn main() {
    let log_level = match env::var("LOG_LEVEL") {
        Ok(value) => value,
        Err(_) => "info".to_string(),
    };
    env::set_var("RUST_LOG", log_level);
    env_logger::init();

    let args = Args::parse();
    let result = match args.cmd {
        Commands::Reconstruct {
            snapshot,
            initial_capacity,
            describe,
        } => reconstruct(snapshot, initial_capacity, describe),
        Commands::Find {
            file,
            min_len,
            max_len,
            min_score,
        } => find(
            file,
            FinderConfig {
                min_len,
                max_len,
                min_score,
            },
        ),
    };

    if let Err(e) = result {
        log::error!("{e}");
        process::exit(1);
    }
}
