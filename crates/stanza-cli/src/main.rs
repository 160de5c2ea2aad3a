//! `stanza` CLI — parse Stanza markup (or strict JSON) and emit JSON.
//!
//! ## Usage
//!
//! ```sh
//! # Parse markup from stdin, pretty JSON on stdout
//! cat config.stz | stanza parse
//!
//! # Parse from file to file
//! stanza parse -i config.stz -o config.json
//!
//! # Parse strict JSON (with #-comments allowed between tokens)
//! stanza json -i data.json
//!
//! # Validate only: exit status reports success, errors go to stderr
//! stanza check -i config.stz
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::process;

#[derive(Parser)]
#[command(name = "stanza", version, about = "Stanza markup parser CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse Stanza markup and print it as pretty JSON
    Parse {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Emit compact JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },
    /// Parse strict JSON (with the #-comment extension) and reprint it
    Json {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Emit compact JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },
    /// Validate the input; print the position of the first error
    Check {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Validate as strict JSON instead of block markup
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            input,
            output,
            compact,
        } => {
            let text = read_input(input.as_deref())?;
            let value =
                stanza_core::parse(&text).context("Failed to parse Stanza input")?;
            write_output(output.as_deref(), &render_json(&value, compact)?)?;
        }
        Commands::Json {
            input,
            output,
            compact,
        } => {
            let text = read_input(input.as_deref())?;
            let value =
                stanza_core::parse_json(&text).context("Failed to parse JSON input")?;
            write_output(output.as_deref(), &render_json(&value, compact)?)?;
        }
        Commands::Check { input, json } => {
            let text = read_input(input.as_deref())?;
            let result = if json {
                stanza_core::parse_json(&text)
            } else {
                stanza_core::parse(&text)
            };
            match result {
                Ok(_) => println!("OK"),
                Err(e) => {
                    eprintln!("error: {e}");
                    process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn render_json(value: &stanza_core::Value, compact: bool) -> Result<String> {
    let json = value.to_json();
    let mut text = if compact {
        serde_json::to_string(&json)?
    } else {
        serde_json::to_string_pretty(&json)?
    };
    text.push('\n');
    Ok(text)
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {path}"))?;
        }
        None => {
            print!("{content}");
        }
    }
    Ok(())
}
