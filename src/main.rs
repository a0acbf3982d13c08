// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Museum Lens command line
//!
//! Sends one to four photographs of an artefact to the inference proxy and
//! prints the curator report.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use museum_lens::collection::{accept_images, ImageFile, MAX_IMAGES};
use museum_lens::config::AppConfig;
use museum_lens::proxy::ProxyClient;
use museum_lens::report::Report;
use museum_lens::{LensError, Result, WorkflowController, WorkflowState};

/// Museum Lens CLI - curator analysis of artefact photographs
#[derive(Parser, Debug)]
#[command(name = "museum-lens")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "AI-assisted curator reports for museum artefacts", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyse one to four photographs of the same object
    Analyze {
        /// Image files, in the order the views should be presented
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Note for one image as POSITION=TEXT, e.g. 2="reverse side"
        #[arg(short, long = "note", value_parser = parse_note)]
        notes: Vec<(usize, String)>,

        /// Replace the default task prompt
        #[arg(short, long)]
        prompt: Option<String>,

        /// Also write the report as Markdown to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Create a default configuration file
    Init {
        /// Directory to initialize (default: current)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

/// Parse `POSITION=TEXT` with a 1-based position
fn parse_note(raw: &str) -> std::result::Result<(usize, String), String> {
    let (position, text) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected POSITION=TEXT, got '{}'", raw))?;
    let position: usize = position
        .trim()
        .parse()
        .map_err(|_| format!("invalid image position '{}'", position))?;
    if position == 0 || position > MAX_IMAGES {
        return Err(format!("image position must be between 1 and {}", MAX_IMAGES));
    }
    Ok((position, text.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Analyze { images, notes, prompt, output } => {
            run_analyze(config, images, notes, prompt, output, &cli.format).await
        }
        Commands::Config { action } => run_config_command(config, action, &cli.config),
        Commands::Init { dir, force } => run_init(dir, force),
    }
}

/// Load, annotate and submit the images, then print the outcome
async fn run_analyze(
    config: AppConfig,
    paths: Vec<PathBuf>,
    notes: Vec<(usize, String)>,
    prompt: Option<String>,
    output: Option<PathBuf>,
    format: &str,
) -> Result<()> {
    let mut files = Vec::new();
    for path in &paths {
        match ImageFile::from_path(path) {
            Ok(file) => files.push(file),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    let files = accept_images(files);
    if files.is_empty() {
        return Err(LensError::Analysis("No image files to analyse".to_string()));
    }

    let transport = Arc::new(ProxyClient::new(&config.proxy)?);
    let prompt = prompt
        .filter(|p| !p.trim().is_empty())
        .or_else(|| config.analysis.effective_prompt_override().map(str::to_string));
    let mut controller = WorkflowController::new(transport).with_prompt_override(prompt);

    let ids = controller.add(files)?;
    for (position, text) in notes {
        match ids.get(position - 1) {
            Some(id) => {
                controller.set_annotation(*id, text)?;
            }
            None => warn!("No image at position {}, note ignored", position),
        }
    }

    info!("Submitting {} image(s) for analysis", ids.len());
    controller.submit().await?;

    match controller.state() {
        WorkflowState::Results(result) => {
            let report = Report::new(controller.images(), result);

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", result.text);
                if !result.references.is_empty() {
                    println!("\nQuellen & Referenzen:");
                    for reference in &result.references {
                        if reference.title.is_empty() {
                            println!("  - {}", reference.uri);
                        } else {
                            println!("  - {} ({})", reference.title, reference.uri);
                        }
                    }
                }
            }

            if let Some(path) = output {
                report.save(&path)?;
                info!("Report written to {:?}", path);
            }
            Ok(())
        }
        WorkflowState::Error(failure) => {
            eprintln!("Analyse unterbrochen: {}", failure.message);
            if let Some(detail) = &failure.detail {
                eprintln!("  {}", detail);
            }
            Err(LensError::Analysis(format!("{} ({})", failure.message, failure.category)))
        }
        other => Err(LensError::Analysis(format!(
            "Analysis ended in unexpected state '{}'",
            other.name()
        ))),
    }
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            ProxyClient::new(&config.proxy)?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Proxy: {}", config.proxy.url);
            println!("  Timeout: {}s", config.proxy.timeout_secs);
            println!(
                "  Prompt: {}",
                config.analysis.effective_prompt_override().unwrap_or("(default)")
            );
        }
    }

    Ok(())
}

/// Write a default config.json
fn run_init(dir: Option<PathBuf>, force: bool) -> Result<()> {
    let target = dir.unwrap_or_else(|| PathBuf::from("."));
    let config_path = target.join("config.json");

    if config_path.exists() && !force {
        return Err(LensError::Config(
            "config.json already exists. Use --force to overwrite".to_string()
        ));
    }

    std::fs::create_dir_all(&target)?;
    AppConfig::default().save(&config_path)?;

    println!("Museum Lens initialized in {:?}", target);
    println!("\nNext steps:");
    println!("  1. Set proxy.url in config.json");
    println!("  2. museum-lens analyze front.jpg back.jpg --note 2=\"Rückseite\"");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_analyze_command() {
        let cli = Cli::try_parse_from([
            "museum-lens", "analyze", "front.jpg", "back.jpg",
            "--note", "2=reverse side", "--output", "report.md",
        ]).unwrap();

        match cli.command {
            Commands::Analyze { images, notes, output, prompt } => {
                assert_eq!(images, vec![PathBuf::from("front.jpg"), PathBuf::from("back.jpg")]);
                assert_eq!(notes, vec![(2, "reverse side".to_string())]);
                assert_eq!(output, Some(PathBuf::from("report.md")));
                assert!(prompt.is_none());
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_cli_analyze_requires_images() {
        assert!(Cli::try_parse_from(["museum-lens", "analyze"]).is_err());
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from([
            "museum-lens", "--format", "json", "-v", "config", "show",
        ]).unwrap();
        assert_eq!(cli.format, "json");
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Config { action: ConfigCommands::Show }));
    }

    #[test]
    fn test_parse_note() {
        assert_eq!(parse_note("1=front view"), Ok((1, "front view".to_string())));
        assert_eq!(parse_note("3=a=b"), Ok((3, "a=b".to_string())));
        assert!(parse_note("0=x").is_err());
        assert!(parse_note("5=x").is_err());
        assert!(parse_note("front").is_err());
        assert!(parse_note("x=y").is_err());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        run_init(Some(dir.path().to_path_buf()), false).unwrap();
        assert!(dir.path().join("config.json").exists());
        assert!(matches!(
            run_init(Some(dir.path().to_path_buf()), false),
            Err(LensError::Config(_))
        ));
        run_init(Some(dir.path().to_path_buf()), true).unwrap();
    }
}
