//! JSON output: unit documents and the patch manifest.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cces_data::CommonEvent;
use log::info;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::CompileError;
use crate::registry::{EventUnit, UnitRegistry};

/// Serialize `value`, compact when `indent` is `None`.
///
/// # Errors
/// Propagates serializer failures.
pub fn to_json<T: Serialize + ?Sized>(value: &T, indent: Option<usize>) -> Result<String, serde_json::Error> {
    let Some(width) = indent else {
        return serde_json::to_string(value);
    };
    let spaces = " ".repeat(width);
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(spaces.as_bytes()));
    value.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// The file body for one standard unit: its document keyed by title.
pub fn unit_document<'a>(unit: &'a EventUnit, event: &'a CommonEvent) -> BTreeMap<&'a str, &'a CommonEvent> {
    BTreeMap::from([(unit.title(), event)])
}

/// Writes compiled units under an output root.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
    indent: Option<usize>,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>, indent: Option<usize>) -> Self {
        Self {
            root: root.into(),
            indent,
        }
    }

    /// Where `path` (relative to the mod root, e.g. `./patches/a.json`) lands on disk.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        self.root.join(path.strip_prefix("./").unwrap_or(path))
    }

    /// Write every standard unit to its output path, returning the files written.
    ///
    /// # Errors
    /// [`CompileError::Io`] or [`CompileError::Json`] on the first failure.
    pub fn write_units(&self, registry: &UnitRegistry) -> Result<Vec<PathBuf>, CompileError> {
        let mut written = Vec::new();
        for (unit, event) in registry.events() {
            let target = self.resolve(unit.path());
            let json = to_json(&unit_document(unit, event), self.indent)?;
            write_file(&target, &json)?;
            info!("wrote '{}'", target.display());
            written.push(target);
        }
        Ok(written)
    }

    /// Write the manifest for `registry` to `patch_file`, resolved under the root.
    ///
    /// # Errors
    /// [`CompileError::Io`] or [`CompileError::Json`].
    pub fn write_manifest(&self, registry: &UnitRegistry, patch_file: &Path) -> Result<PathBuf, CompileError> {
        let target = self.resolve(patch_file);
        let json = to_json(&registry.manifest(), self.indent)?;
        write_file(&target, &json)?;
        info!("wrote manifest '{}' ({} units)", target.display(), registry.len());
        Ok(target)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), CompileError> {
    let io_err = |source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, contents).map_err(io_err)
}
