//! `cces` command-line compiler.
//!
//! Usage: cces [-i [NUM]] [-r] [-p DATABASE | --no-patch-file] <PATH>...

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use cces_script::{Config, OutputWriter, compile_files, discover_scripts};
use clap::Parser;
use log::warn;

#[derive(Parser)]
#[command(author, version, about = "Compile eventscript files into CrossCode common-event patches.")]
struct Cli {
    /// Script files, or a directory with `--recursive`.
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,
    /// Indent JSON output; a bare flag means 4 spaces.
    #[arg(short, long, value_name = "NUM", num_args = 0..=1, default_missing_value = "4")]
    indent: Option<usize>,
    /// Log progress at info level.
    #[arg(short, long)]
    verbose: bool,
    /// Compile every `.cces` file under the first path.
    #[arg(short, long)]
    recursive: bool,
    /// Do not write the patch manifest.
    #[arg(long)]
    no_patch_file: bool,
    /// Where to write the patch manifest.
    #[arg(short, long, value_name = "DATABASE", conflicts_with = "no_patch_file")]
    patch_file: Option<PathBuf>,
    /// Root directory for the generated `patches/` tree.
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,
    /// Configuration file (defaults to `cces.toml` if present).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = Config::load_or_default(cli.config.as_deref()).context("loading configuration")?;
    let roster = config.roster();

    let scripts = if cli.recursive {
        if cli.paths.len() > 1 {
            warn!("--recursive only scans the first path; ignoring the rest");
        }
        let Some(dir) = cli.paths.first() else {
            bail!("no directory given");
        };
        if !dir.is_dir() {
            bail!("'{}' is not a directory", dir.display());
        }
        discover_scripts(dir)?
    } else {
        cli.paths.clone()
    };
    if scripts.is_empty() {
        warn!("no eventscript files found");
    }

    let registry = compile_files(&scripts, &roster)?;

    let out_dir = cli.out_dir.clone().unwrap_or_else(|| config.out_dir());
    let writer = OutputWriter::new(out_dir, cli.indent.or(config.indent));
    writer.write_units(&registry).context("writing event files")?;
    if !cli.no_patch_file {
        let patch_file = cli.patch_file.clone().unwrap_or_else(|| config.patch_file());
        writer
            .write_manifest(&registry, &patch_file)
            .context("writing patch manifest")?;
    }
    Ok(())
}
