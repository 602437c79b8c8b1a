mod commands;
mod reader;

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;

use cml_core::ModelSummary;
use commands::validate::ValidateArgs;
use reader::Project;

#[derive(Parser)]
#[command(
    name = "cml",
    version,
    about = "Structural, annotation and association checks for .cml constraint models"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse CML files and output a JSON model summary
    Parse {
        /// Input path (file or directory, defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Write output to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyze type inheritance and relations and output a graph
    Analyze {
        /// Input path (file or directory, defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format: mermaid (default) or dot
        #[arg(long, default_value = "mermaid")]
        format: String,
    },

    /// Validate CML files and report issues
    Validate {
        /// Input path (file or directory, defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Data directory holding association exports (repeatable)
        #[arg(long = "data-dir")]
        data_dirs: Vec<PathBuf>,

        /// Expression set name used for association lookups
        #[arg(long)]
        expression_set_name: Option<String>,

        /// Skip annotation whitelist and value checks
        #[arg(long)]
        no_annotations: bool,

        /// Output format: human (default) or json
        #[arg(long, default_value = "human")]
        format: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Parse { path, output } => match run_parse(&path, output.as_deref()) {
            Ok(json) => {
                println!("{json}");
            }
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        },
        Commands::Analyze { path, format } => {
            match commands::analyze::run_analyze(&path, &format) {
                Ok(output) => {
                    println!("{output}");
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            }
        }
        Commands::Validate {
            path,
            data_dirs,
            expression_set_name,
            no_annotations,
            format,
        } => {
            let args = ValidateArgs {
                path: &path,
                data_dirs: &data_dirs,
                expression_set_name: expression_set_name.as_deref(),
                no_annotations,
                format: &format,
            };
            match commands::validate::run_validate(&args) {
                Ok((output, failed)) => {
                    println!("{output}");
                    if failed {
                        process::exit(1);
                    }
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            }
        }
    }
}

/// Log events go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn build_models(input_path: &Path) -> Result<Vec<ModelSummary>, String> {
    let project = Project::discover(input_path)?;
    let files = project.read_files()?;

    if files.is_empty() {
        return Err(format!("No .cml files found at: {}", input_path.display()));
    }

    Ok(files
        .iter()
        .map(|f| {
            let name = project.display_path(&f.path.to_string_lossy());
            ModelSummary::from_source(&f.content, &name)
        })
        .collect())
}

fn run_parse(input_path: &Path, output_file: Option<&Path>) -> Result<String, String> {
    let summaries = build_models(input_path)?;
    let json = serde_json::to_string_pretty(&summaries)
        .map_err(|e| format!("JSON serialization error: {e}"))?;

    if let Some(out_path) = output_file {
        std::fs::write(out_path, &json)
            .map_err(|e| format!("Failed to write {}: {e}", out_path.display()))?;
        return Ok(format!("Written to {}", out_path.display()));
    }

    Ok(json)
}
