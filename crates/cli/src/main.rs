//! MX32 simulator CLI.
//!
//! This binary runs one guest program to completion. It performs:
//! 1. **Setup:** Parses arguments, reads an optional JSON configuration,
//!    and initializes structured logging.
//! 2. **Loading:** Loads an ELF executable (default) or a flat image at
//!    a chosen address.
//! 3. **Execution:** Runs until the program exits or stops, prints the
//!    run statistics, and propagates the guest exit status.

use std::{fs, process};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mxsim_core::common::Endianness;
use mxsim_core::common::StopResult;
use mxsim_core::config::Config;
use mxsim_core::sim::Simulator;

#[derive(Parser, Debug)]
#[command(
    name = "sim",
    author,
    version,
    about = "MX32 instruction-set simulator",
    long_about = "Run an MX32 executable to completion.\n\nExamples:\n  sim program.elf\n  sim --raw --load-address 0x1000 payload.bin\n  sim --config sim.json --big-endian program.elf"
)]
struct Cli {
    /// Executable to run (ELF unless --raw).
    file: String,

    /// Treat the file as a flat byte image instead of ELF.
    #[arg(long)]
    raw: bool,

    /// Base address for a --raw image.
    #[arg(long, default_value = "0x1000", value_parser = parse_address)]
    load_address: u32,

    /// Entry PC for a --raw image (defaults to the load address).
    #[arg(long, value_parser = parse_address)]
    entry: Option<u32>,

    /// Simulate a big-endian target.
    #[arg(long)]
    big_endian: bool,

    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<String>,

    /// Logging verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Parses `0x`-prefixed hex or plain decimal addresses.
fn parse_address(text: &str) -> Result<u32, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("bad address '{text}': {e}"))
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("error: could not read config '{path}': {e}");
                process::exit(1);
            });
            Config::from_json(&text).unwrap_or_else(|e| {
                eprintln!("error: bad config '{path}': {e}");
                process::exit(1);
            })
        }
        None => Config::default(),
    };
    if cli.big_endian {
        config.endianness = Endianness::Big;
    }
    config
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli);
    let mut sim = Simulator::new(config);

    let data = fs::read(&cli.file).unwrap_or_else(|e| {
        eprintln!("error: could not read '{}': {e}", cli.file);
        process::exit(1);
    });

    if cli.raw {
        let entry = cli.entry.unwrap_or(cli.load_address);
        sim.load_image(&data, cli.load_address, entry);
        info!(base = format_args!("{:#010x}", cli.load_address), entry = format_args!("{entry:#010x}"), "loaded raw image");
    } else {
        match sim.load_elf(&data) {
            Ok(entry) => info!(entry = format_args!("{entry:#010x}"), "loaded executable"),
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
    }

    let result = sim.run();
    sim.report();

    match result {
        StopResult::Exited(status) => process::exit(status),
        StopResult::Stopped(sig) => {
            error!(signal = sig, "program stopped");
            process::exit(128 + sig);
        }
        StopResult::HitBreak => {
            error!("breakpoint outside debugger control");
            process::exit(1);
        }
        StopResult::Stepped => unreachable!("run() never yields Stepped"),
    }
}
