//! Compiler for eventscript, a line-oriented language for authoring
//! CrossCode common events.
//!
//! A run parses one or more `.cces` files into a shared [`UnitRegistry`],
//! then writes one JSON document per titled event and a patch manifest that
//! tells the game how to load them.
//!
//! ```
//! use cces_data::Roster;
//! use cces_script::{UnitRegistry, compile_str};
//!
//! let src = "== intro ==\nmessage 1:\nLea > HAPPY: Hi!\n";
//! let mut registry = UnitRegistry::default();
//! compile_str("intro.cces", src, &Roster::default(), &mut registry).unwrap();
//! assert!(registry.contains("intro"));
//! ```

pub mod config;
pub mod output;
pub mod parser;
pub mod registry;
pub mod source;

use std::fs;
use std::path::{Path, PathBuf};

use cces_data::Roster;
use log::{debug, info};
use walkdir::WalkDir;

pub use config::{Config, ConfigError};
pub use output::{OutputWriter, to_json};
pub use parser::{ParseError, ParseMode, ScriptError, ScriptParser};
pub use registry::{EventUnit, UnitKind, UnitRegistry};
pub use source::UsageError;

/// File extension of eventscript sources.
pub const SCRIPT_EXTENSION: &str = "cces";

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{file}:{line}: {kind}")]
    Script { file: String, line: usize, kind: ScriptError },
    #[error("{file}: internal parser error: {source}")]
    Usage {
        file: String,
        #[source]
        source: UsageError,
    },
    #[error("failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to scan '{}': {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CompileError {
    fn from_parse(file: &str, err: ParseError) -> Self {
        match err {
            ParseError::Script { line, kind } => CompileError::Script {
                file: file.to_string(),
                line,
                kind,
            },
            ParseError::Usage(source) => CompileError::Usage {
                file: file.to_string(),
                source,
            },
        }
    }

    /// The malformed-input error, if this is one.
    pub fn script_error(&self) -> Option<&ScriptError> {
        match self {
            CompileError::Script { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

/// Parse `text` (named `file` in diagnostics) into `registry`.
///
/// # Errors
/// [`CompileError::Script`] or [`CompileError::Usage`], tagged with `file`.
pub fn compile_str(file: &str, text: &str, roster: &Roster, registry: &mut UnitRegistry) -> Result<(), CompileError> {
    let before = registry.len();
    ScriptParser::new(text, roster)
        .parse_into(registry)
        .map_err(|err| CompileError::from_parse(file, err))?;
    debug!("{file}: {} units", registry.len() - before);
    Ok(())
}

/// Read and parse one script file into `registry`.
///
/// # Errors
/// [`CompileError::Io`] if the file cannot be read, otherwise as [`compile_str`].
pub fn compile_source(path: &Path, roster: &Roster, registry: &mut UnitRegistry) -> Result<(), CompileError> {
    info!("compiling '{}'", path.display());
    let text = fs::read_to_string(path).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    compile_str(&path.display().to_string(), &text, roster, registry)
}

/// Parse `paths` in order into a fresh registry, stopping at the first error.
///
/// # Errors
/// The first failure from [`compile_source`]; titles are unique across all files.
pub fn compile_files<P: AsRef<Path>>(paths: &[P], roster: &Roster) -> Result<UnitRegistry, CompileError> {
    let mut registry = UnitRegistry::default();
    for path in paths {
        compile_source(path.as_ref(), roster, &mut registry)?;
    }
    info!("compiled {} files into {} units", paths.len(), registry.len());
    Ok(registry)
}

/// Find every `.cces` file under `dir`, sorted by name within each directory.
/// Files and directories whose names start with `!` are left out.
///
/// # Errors
/// [`CompileError::Scan`] if the directory tree cannot be read.
pub fn discover_scripts(dir: &Path) -> Result<Vec<PathBuf>, CompileError> {
    let mut found = Vec::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('!'));
    for entry in walker {
        let entry = entry.map_err(|source| CompileError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;
        let is_script = entry.path().extension().is_some_and(|ext| ext == SCRIPT_EXTENSION);
        if entry.file_type().is_file() && is_script {
            found.push(entry.into_path());
        }
    }
    debug!("found {} scripts under '{}'", found.len(), dir.display());
    Ok(found)
}
