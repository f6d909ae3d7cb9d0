#![forbid(unsafe_code)]

use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::debug;
use mdpad_core::{disk_io, markdown};

#[derive(Parser)]
#[command(name = "mdpad-cli", about = "Render markdown without opening the editor", version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render markdown to HTML, exactly as the editor's preview does.
    Render {
        /// Path to a markdown file. Use `-` to read from stdin.
        path: PathBuf,

        /// Write the HTML here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render markdown to a simple plain-text preview and print to stdout.
    Preview {
        /// Path to a markdown file. Use `-` to read from stdin.
        path: PathBuf,
    },
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        return read_stream(io::stdin().lock());
    }

    Ok(disk_io::read_utf8(path)?)
}

fn read_stream(mut reader: impl Read) -> anyhow::Result<String> {
    let mut buf = String::new();
    reader
        .read_to_string(&mut buf)
        .context("failed to read markdown from stdin")?;
    Ok(buf)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    match cli.command {
        Command::Render { path, output } => {
            let source = read_source(&path)?;
            let html = markdown::render(&source);
            debug!(
                "rendered {} bytes of markdown to {} bytes of html",
                source.len(),
                html.len()
            );
            match output {
                Some(output) => disk_io::atomic_write_utf8(&output, &html)
                    .with_context(|| format!("failed to write html to {}", output.display()))?,
                None => print!("{html}"),
            }
        }
        Command::Preview { path } => {
            let source = read_source(&path)?;
            print!("{}", markdown::plain_text(&source));
        }
    }

    Ok(())
}
