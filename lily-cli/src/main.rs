use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use lily_core::ast::SourceUnit;
use lily_core::span::FileId;
use lily_core::{AnalysisConfig, CheckedPackage, analyze};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// コマンドライン引数を定義するための構造体
#[derive(Parser, Debug)]
#[command(version, about = "Semantic analysis of Lily parser units", long_about = None)]
struct Cli {
    /// Parser unit (JSON) or a directory of units; stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Analysis configuration (JSON)")]
    config: Option<PathBuf>,

    #[arg(long, help = "Require explicit casts for numeric widening")]
    no_implicit_cast: bool,

    #[arg(long, help = "Disable naming-convention warnings")]
    no_naming: bool,

    #[arg(long, help = "Disable match exhaustiveness checking")]
    no_exhaustiveness: bool,

    #[arg(long, value_name = "N", help = "Bound on nested instantiations")]
    max_instantiation_depth: Option<usize>,

    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "warn",
        help = "Log filter used when LILY_LOG is not set"
    )]
    log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[arg(long, help = "Print the scope tree after analysis")]
    dump_scopes: bool,

    #[arg(long, help = "Print every signature after analysis")]
    dump_signatures: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format)?;
    execute(cli)
}

fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = match EnvFilter::try_from_env("LILY_LOG") {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level {level}"))?,
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| anyhow::anyhow!(err))
}

fn execute(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let units = match &cli.input {
        Some(path) => load_units(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            vec![SourceUnit::from_json(&buffer).context("failed to parse unit from stdin")?]
        }
    };
    tracing::info!(units = units.len(), "units loaded");

    let package = analyze(&units, &config);
    match cli.format {
        OutputFormat::Text => print_text(&package),
        OutputFormat::Json => print_json(&package)?,
    }
    if cli.dump_scopes {
        print!("{}", lily_core::dump::scope_tree(&package));
    }
    if cli.dump_signatures {
        print!("{}", lily_core::dump::signature_table(&package));
    }

    let errors = package.diagnostics.error_count();
    if errors != 0 {
        bail!("analysis failed with {errors} error(s)");
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid config file {}", path.display()))?
        }
        None => AnalysisConfig::default(),
    };
    if cli.no_implicit_cast {
        config.allow_implicit_cast = false;
    }
    if cli.no_naming {
        config.naming_conventions = false;
    }
    if cli.no_exhaustiveness {
        config.exhaustiveness = false;
    }
    if let Some(depth) = cli.max_instantiation_depth {
        config.max_instantiation_depth = depth;
    }
    Ok(config)
}

/// One unit per `.json` file; directories are walked in name order.
fn load_units(path: &Path) -> Result<Vec<SourceUnit>> {
    let files: Vec<PathBuf> = if path.is_dir() {
        let mut files = Vec::new();
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.with_context(|| format!("failed to walk {}", path.display()))?;
            let is_json = entry.path().extension().is_some_and(|ext| ext == "json");
            if entry.file_type().is_file() && is_json {
                files.push(entry.into_path());
            }
        }
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut units = Vec::with_capacity(files.len());
    for (index, file) in files.iter().enumerate() {
        let text = fs::read_to_string(file)
            .with_context(|| format!("failed to read input file {}", file.display()))?;
        let mut unit = SourceUnit::from_json(&text)
            .with_context(|| format!("failed to parse unit {}", file.display()))?;
        unit.file = FileId(index as u32);
        tracing::debug!(file = %file.display(), name = %unit.name, "unit");
        units.push(unit);
    }
    Ok(units)
}

fn print_text(package: &CheckedPackage) {
    for diagnostic in package.diagnostics.iter() {
        println!("{diagnostic}");
    }
    let signatures: usize = package.decls.iter().map(|d| d.signatures.len()).sum();
    println!(
        "{} error(s), {} warning(s), {} signature(s)",
        package.diagnostics.error_count(),
        package.diagnostics.warning_count(),
        signatures
    );
}

fn print_json(package: &CheckedPackage) -> Result<()> {
    let diagnostics: Vec<_> = package
        .diagnostics
        .iter()
        .map(|d| {
            json!({
                "severity": d.severity,
                "code": d.code(),
                "message": d.message,
                "span": d.span,
            })
        })
        .collect();
    let signatures: Vec<_> = package
        .decls
        .iter()
        .flat_map(|d| d.signatures.iter())
        .map(|s| s.ser_global_name.as_str())
        .collect();
    let report = json!({
        "errors": package.diagnostics.error_count(),
        "warnings": package.diagnostics.warning_count(),
        "diagnostics": diagnostics,
        "signatures": signatures,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
