//! wrapgen CLI

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};
use wrapgen_checker::TargetLanguage;
use wrapgen_compiler::{presets, Backend, GenerationReport, Generator, GeneratorConfig, GeneratorError};
use wrapgen_model::TypeModel;

#[derive(Parser)]
#[command(name = "wrapgen")]
#[command(about = "Generate Swift, Kotlin and C++ wrappers over a C ABI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate wrappers for a model document
    Generate(GenerateArgs),

    /// Validate a model document and check it against every target
    Check(CheckArgs),

    /// Show available targets
    Targets,

    /// Create a configuration file
    InitConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "wrapgen.toml")]
        output: PathBuf,

        /// Starting point for the configuration
        #[arg(short, long, value_enum, default_value_t = Preset::Default)]
        preset: Preset,
    },

    /// Validate configuration file
    ValidateConfig {
        /// Configuration file path
        path: PathBuf,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Model document (JSON)
    input: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "generated")]
    output: PathBuf,

    /// Restrict generation to these targets
    #[arg(short, long = "target")]
    targets: Vec<TargetLanguage>,
}

#[derive(Args)]
struct CheckArgs {
    /// Model document (JSON)
    input: PathBuf,

    /// Restrict the check to these targets
    #[arg(short, long = "target")]
    targets: Vec<TargetLanguage>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Preset {
    Default,
    TrustWallet,
    SwiftOnly,
}

impl Preset {
    fn config(self) -> GeneratorConfig {
        match self {
            Preset::Default => GeneratorConfig::default(),
            Preset::TrustWallet => presets::trust_wallet(),
            Preset::SwiftOnly => presets::swift_only(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate(args) => handle_generate(args, cli.config).await,
        Commands::Check(args) => handle_check(args, cli.config).await,
        Commands::Targets => handle_targets(),
        Commands::InitConfig { output, preset } => handle_init_config(output, preset),
        Commands::ValidateConfig { path } => handle_validate_config(path),
    }
}

fn load_config(path: Option<&Path>, targets: &[TargetLanguage]) -> Result<GeneratorConfig> {
    let mut config = match path {
        Some(path) => GeneratorConfig::from_file(path)?,
        None => GeneratorConfig::default(),
    };
    if !targets.is_empty() {
        config.targets = targets.to_vec();
    }
    Ok(config)
}

async fn load_model(path: &Path) -> Result<TypeModel> {
    let source = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    TypeModel::from_json(&source).with_context(|| format!("invalid model {}", path.display()))
}

async fn handle_generate(args: GenerateArgs, config_path: Option<PathBuf>) -> Result<()> {
    info!("Generating wrappers for {}", args.input.display());

    let config = load_config(config_path.as_deref(), &args.targets)?;
    let generator = Generator::new(config)?;
    let model = load_model(&args.input).await?;

    let report = match generator.generate(&model) {
        Ok(report) => report,
        Err(err) => return Err(report_failure(err)),
    };
    write_report(&report, &args.output).await?;

    info!("Generation successful!");
    info!("  Check time: {:?}", report.metadata.check_time);
    info!("  Emit time: {:?}", report.metadata.emit_time);
    info!("  Total time: {:?}", report.metadata.total_time);
    info!(
        "  Generated {} files ({} bytes) into {}",
        report.metadata.generated_files,
        report.metadata.total_output_size,
        args.output.display()
    );
    Ok(())
}

async fn write_report(report: &GenerationReport, output: &Path) -> Result<()> {
    for file in &report.files {
        let full_path = output.join(&file.path);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        tokio::fs::write(&full_path, &file.contents)
            .await
            .with_context(|| format!("failed to write {}", full_path.display()))?;
        info!("  {} {}", &file.fingerprint[..12], full_path.display());
    }
    Ok(())
}

async fn handle_check(args: CheckArgs, config_path: Option<PathBuf>) -> Result<()> {
    info!("Checking {}", args.input.display());

    let config = load_config(config_path.as_deref(), &args.targets)?;
    let generator = Generator::new(config)?;
    let model = load_model(&args.input).await?;

    match generator.check(&model) {
        Ok(report) => {
            info!(
                "Check successful: {} members across {} target(s)",
                report.members_checked,
                report.targets.len()
            );
            Ok(())
        }
        Err(err) => Err(report_failure(err)),
    }
}

/// Log every aggregated issue before failing
fn report_failure(err: GeneratorError) -> anyhow::Error {
    match &err {
        GeneratorError::Consistency(consistency) | GeneratorError::Parity(consistency) => {
            error!("{} issue(s) found:", consistency.len());
            for issue in &consistency.issues {
                error!("  {}", issue);
            }
        }
        other => error!("{}", other),
    }
    warn!("No files were written");
    anyhow::anyhow!("generation failed at the {:?} stage", err.stage())
}

fn handle_targets() -> Result<()> {
    println!("Available targets:");
    for target in Backend::available_targets() {
        println!("  {:<8} .{}", target.name(), target.file_extension());
    }
    Ok(())
}

fn handle_init_config(output: PathBuf, preset: Preset) -> Result<()> {
    if output.exists() {
        bail!("{} already exists", output.display());
    }
    info!("Creating configuration file at {}", output.display());
    preset.config().to_file(&output)?;
    info!("Configuration file created successfully!");
    Ok(())
}

fn handle_validate_config(path: PathBuf) -> Result<()> {
    info!("Validating configuration file {}", path.display());
    let config = GeneratorConfig::from_file(&path)?;
    config.validate()?;
    info!("Configuration file is valid!");
    Ok(())
}
