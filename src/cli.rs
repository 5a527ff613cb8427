use crate::engine::ResumeEngine;
use crate::model::{EngineConfig, PlayIntent, RunOutcome, DEFAULT_MEDIA_EXTENSIONS};
use crate::text_summary;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "mpv-recall",
    version,
    about = "Resume mpv playback exactly where you left off"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Player executable to launch
    #[arg(long, default_value = "mpv", global = true)]
    pub player: String,

    /// Session store location (defaults to the user cache directory)
    #[arg(long, global = true)]
    pub cache_file: Option<PathBuf>,

    /// Comma-separated extensions that count as playable media
    #[arg(long, value_delimiter = ',', global = true)]
    pub extensions: Vec<String>,

    /// Print the run outcome as JSON (no text summary)
    #[arg(long, global = true)]
    pub json: bool,

    /// Dump the captured player output after the run (for debugging)
    #[arg(long, global = true)]
    pub show_output: bool,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Play a single file; re-opening the last file resumes it
    Play {
        /// Media file to play
        path: PathBuf,
    },
    /// Play a folder as an ordered playlist
    PlayFolder {
        /// Folder to enumerate and play
        path: PathBuf,
    },
    /// Resume the last session at its saved position and playlist entry
    Resume,
    /// Show the stored session without launching anything
    Status,
}

/// Build the process-wide engine configuration from CLI arguments.
pub fn build_config(args: &Cli) -> EngineConfig {
    let media_extensions = if args.extensions.is_empty() {
        DEFAULT_MEDIA_EXTENSIONS
            .iter()
            .map(|s| s.to_string())
            .collect()
    } else {
        args.extensions
            .iter()
            .map(|s| s.trim_start_matches('.').to_ascii_lowercase())
            .collect()
    };
    EngineConfig {
        player: args.player.clone(),
        cache_file: args
            .cache_file
            .clone()
            .unwrap_or_else(EngineConfig::default_cache_file),
        media_extensions,
        output_capture_bytes: 64 * 1024,
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let engine = ResumeEngine::new(build_config(&args));

    let intent = match &args.command {
        Command::Play { path } => PlayIntent::NewFile(path.clone()),
        Command::PlayFolder { path } => PlayIntent::NewFolder(path.clone()),
        Command::Resume => PlayIntent::ResumeLast,
        Command::Status => return run_status(&args, &engine),
    };

    match engine.play(&intent).await {
        Ok(outcome) => {
            print_outcome(&args, &outcome)?;
            Ok(())
        }
        Err(e) if e.is_recoverable() => {
            // Pick-something-else errors, not failures worth a backtrace.
            eprintln!("{e}");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn run_status(args: &Cli, engine: &ResumeEngine) -> Result<()> {
    match engine.stored_session() {
        Some(record) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                for line in text_summary::build_session_summary(&record).lines {
                    println!("{line}");
                }
            }
        }
        None => {
            if args.json {
                println!("null");
            } else {
                println!("No previous playback data found. Play something new to begin.");
            }
        }
    }
    Ok(())
}

fn print_outcome(args: &Cli, outcome: &RunOutcome) -> Result<()> {
    if args.json {
        let doc = serde_json::json!({
            "exit_code": outcome.exit_code,
            "report_received": outcome.report_received,
            "session": outcome.session,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        for line in text_summary::build_outcome_summary(outcome).lines {
            println!("{line}");
        }
    }
    if args.show_output && !outcome.captured_output.is_empty() {
        eprintln!("--- player output ---");
        eprint!("{}", outcome.captured_output);
    }
    Ok(())
}
