//! Lumen Language Server binary.
//!
//! Usage:
//!   lumen-lsp [options]
//!
//! Options:
//!   --stdio      Use stdio for communication (default)
//!   --log        Verbose logging to stderr
//!   --version    Show version information
//!   --help       Show this help message

use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = env::args().collect();
    let mut enable_logging = false;

    for arg in &args[1..] {
        match arg.as_str() {
            "--stdio" => {}
            "--log" => enable_logging = true,
            "--version" => {
                println!("lumen-lsp {}", env!("CARGO_PKG_VERSION"));
                process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            other => {
                eprintln!("Unknown option: {other}");
                print_help();
                process::exit(1);
            }
        }
    }

    // stdout carries the protocol; every diagnostic goes to stderr
    let default_filter = if enable_logging { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = lumen_lsp::run_stdio() {
        eprintln!("lumen-lsp: {err}");
        process::exit(1);
    }
}

fn print_help() {
    eprintln!("Lumen Language Server");
    eprintln!();
    eprintln!("Usage: lumen-lsp [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --stdio      Use stdio for communication (default)");
    eprintln!("  --log        Verbose logging to stderr");
    eprintln!("  --version    Show version information");
    eprintln!("  --help       Show this help message");
}
