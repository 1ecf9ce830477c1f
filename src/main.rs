mod artwork;
mod config;
mod errors;
mod formats;
mod naming;
mod pipeline;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use log::info;
use serde::Serialize;

use crate::config::ProcessOptions;
use crate::pipeline::{FolderRenameResult, Outcome, ProcessingResult, Summary};

#[derive(Parser, Debug)]
#[command(name = "artfix", version, about = "Normalize embedded cover art and rename audio files from tag metadata")]
struct Cli {
    /// Directory to scan for audio files
    #[arg(default_value = ".")]
    directory: std::path::PathBuf,

    /// Embed and normalize cover art (the default when no operation is given)
    #[arg(long)]
    embed: bool,

    /// Rename files to "NN. Title.ext" from track metadata
    #[arg(long)]
    rename: bool,

    /// Rename immediate subfolders after their majority album name
    #[arg(long)]
    rename_folders: bool,

    /// Worker count for file processing
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Copy each file to a "_backup" sibling before the first write
    #[arg(long)]
    backup: bool,

    /// Report what would happen without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Emit a JSON report instead of per-file lines
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct FileReport<'a> {
    summary: &'a Summary,
    results: &'a [ProcessingResult],
}

#[derive(Serialize)]
struct FolderReport<'a> {
    summary: &'a Summary,
    results: &'a [FolderRenameResult],
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    if !cli.directory.is_dir() {
        eprintln!("Directory not found: {}", cli.directory.display());
        std::process::exit(2);
    }

    let options = Arc::new(ProcessOptions {
        // No operation flag means embed, matching the tool's historic default.
        do_embed: cli.embed || (!cli.rename && !cli.rename_folders),
        do_rename: cli.rename,
        backup: cli.backup,
        dry_run: cli.dry_run,
        workers: cli.workers,
        ..ProcessOptions::default()
    });

    if cli.dry_run {
        info!("dry run: nothing will be written");
    }

    let summary = if cli.rename_folders {
        rename_folders(&cli.directory, &options, cli.json)
    } else {
        process_files(&cli.directory, Arc::clone(&options), cli.json).await
    };

    if summary.errors > 0 {
        std::process::exit(1);
    }
}

async fn process_files(directory: &Path, options: Arc<ProcessOptions>, json: bool) -> Summary {
    let files = pipeline::find_audio_files(directory, &options);
    if files.is_empty() {
        println!("No audio files found in {}", directory.display());
        return Summary::default();
    }

    if !json {
        println!("Processing {} files...", files.len());
    }

    let (summary, results) = pipeline::run_batch(files, options, |result| {
        if !json {
            print_file_line(result);
        }
    })
    .await;

    if json {
        print_json(&FileReport {
            summary: &summary,
            results: &results,
        });
    } else {
        print_results(&summary);
    }
    summary
}

fn rename_folders(directory: &Path, options: &ProcessOptions, json: bool) -> Summary {
    let folders = match pipeline::immediate_subdirs(directory) {
        Ok(folders) => folders,
        Err(e) => {
            eprintln!("Error scanning {}: {e}", directory.display());
            std::process::exit(2);
        }
    };
    if folders.is_empty() {
        println!("No subdirectories found in {}", directory.display());
        return Summary::default();
    }

    if !json {
        println!("Processing {} folders...", folders.len());
    }

    let mut summary = Summary {
        total: folders.len(),
        ..Summary::default()
    };
    let mut results = Vec::with_capacity(folders.len());
    for folder in folders {
        let result = pipeline::process_folder(&folder, options);
        summary.record(&result.outcome);
        if !json {
            print_folder_line(&folder, &result);
        }
        results.push(result);
    }

    if json {
        print_json(&FolderReport {
            summary: &summary,
            results: &results,
        });
    } else {
        print_results(&summary);
    }
    summary
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_file_line(result: &ProcessingResult) {
    match &result.outcome {
        Outcome::Processed => {}
        Outcome::Skipped(reason) => {
            println!("  [-] Skipped: {} ({reason})", display_name(&result.path));
        }
        Outcome::Error(message) => {
            println!("  [!] Error: {} - {message}", display_name(&result.path));
        }
    }
}

fn print_folder_line(original: &Path, result: &FolderRenameResult) {
    match &result.outcome {
        Outcome::Processed => {
            println!(
                "  [+] Renamed: {} -> {}",
                display_name(original),
                display_name(&result.path)
            );
        }
        Outcome::Skipped(reason) => {
            println!("  [-] Skipped: {} ({reason})", display_name(original));
        }
        Outcome::Error(message) => {
            println!("  [!] Error: {} - {message}", display_name(original));
        }
    }
}

fn print_results(summary: &Summary) {
    println!();
    println!("Total     : {}", summary.total);
    println!("Processed : {}", summary.processed);
    println!("Skipped   : {}", summary.skipped);
    println!("Errors    : {}", summary.errors);
}

fn print_json(report: &impl Serialize) {
    match serde_json::to_string_pretty(report) {
        Ok(out) => println!("{out}"),
        Err(e) => eprintln!("Failed to serialize report: {e}"),
    }
}
