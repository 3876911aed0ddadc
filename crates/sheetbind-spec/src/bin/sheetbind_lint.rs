use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use sheetbind_spec::{Manifest, generate_schema_json_pretty};

/// Validate sheetbind column manifests.
#[derive(Debug, Parser)]
#[command(name = "sheetbind-lint", version, about)]
struct Cli {
    /// Manifest files (`.yaml`, `.yml`, or `.json`).
    #[arg(required_unless_present = "schema")]
    files: Vec<PathBuf>,

    /// Print the manifest JSON Schema and exit.
    #[arg(long)]
    schema: bool,

    /// Print the normalized manifest after a successful validation.
    #[arg(long)]
    normalize: bool,
}

fn load(path: &Path) -> Result<Manifest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let manifest = if is_json {
        Manifest::from_json_str(&text).with_context(|| format!("{} is not a manifest", path.display()))?
    } else {
        Manifest::from_yaml_str(&text).with_context(|| format!("{} is not a manifest", path.display()))?
    };
    Ok(manifest)
}

fn run(cli: &Cli) -> Result<bool> {
    if cli.schema {
        println!("{}", generate_schema_json_pretty());
        return Ok(true);
    }

    let mut all_ok = true;
    for path in &cli.files {
        let manifest = match load(path) {
            Ok(manifest) => manifest,
            Err(err) => {
                eprintln!("{}: error: {err:#}", path.display());
                all_ok = false;
                continue;
            }
        };
        match manifest.validate() {
            Ok(()) => {
                println!("{}: ok ({} columns)", path.display(), manifest.columns.len());
                if cli.normalize {
                    print!("{}", manifest.normalized().to_yaml()?);
                }
            }
            Err(err) => {
                all_ok = false;
                eprintln!("{}: {err}", path.display());
                for issue in err.issues() {
                    eprintln!("  - {issue}");
                }
            }
        }
    }
    Ok(all_ok)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    Ok(if run(&cli)? {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
