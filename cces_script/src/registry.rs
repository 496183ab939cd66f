//! Unit registry and patch-manifest emitter.
//!
//! Every title or directive seen across the input files becomes one unit.
//! Units keep the order in which they were registered, and that order is the
//! order of the manifest.

use std::collections::HashMap;

use cces_data::{COMMON_EVENTS_INDEX, CommonEvent, PatchStep};

use crate::parser::{ScriptError, directive_output_path, is_valid_output_path, title_output_path};

/// How the host loads a unit.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitKind {
    /// Compiled from a titled event; carries the document to write.
    Standard(CommonEvent),
    /// Hand-written JSON file merged into the event table.
    Import,
    /// Hand-written patch file applied in place.
    Include,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventUnit {
    title: String,
    path: String,
    kind: UnitKind,
}

impl EventUnit {
    /// # Errors
    /// [`ScriptError::InvalidPath`] if the title does not make a usable path.
    pub fn standard(title: &str, event: CommonEvent) -> Result<Self, ScriptError> {
        Self::checked(title, title_output_path(title), UnitKind::Standard(event))
    }

    /// # Errors
    /// [`ScriptError::InvalidPath`] if the directory or file name is malformed.
    pub fn import(filename: &str, directory: &str, extension: Option<&str>) -> Result<Self, ScriptError> {
        Self::directive(filename, directory, extension, UnitKind::Import)
    }

    /// # Errors
    /// [`ScriptError::InvalidPath`] if the directory or file name is malformed.
    pub fn include(filename: &str, directory: &str, extension: Option<&str>) -> Result<Self, ScriptError> {
        Self::directive(filename, directory, extension, UnitKind::Include)
    }

    fn directive(filename: &str, directory: &str, extension: Option<&str>, kind: UnitKind) -> Result<Self, ScriptError> {
        let path = directive_output_path(&directory.replace('\\', "/"), filename, extension);
        Self::checked(filename, path, kind)
    }

    fn checked(title: &str, path: String, kind: UnitKind) -> Result<Self, ScriptError> {
        if title.is_empty() || !is_valid_output_path(&path) {
            return Err(ScriptError::InvalidPath(path));
        }
        Ok(Self {
            title: title.to_string(),
            path,
            kind,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Output path relative to the mod root, starting with `./patches/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> &UnitKind {
        &self.kind
    }

    /// The compiled document, for standard units.
    pub fn event(&self) -> Option<&CommonEvent> {
        match &self.kind {
            UnitKind::Standard(event) => Some(event),
            UnitKind::Import | UnitKind::Include => None,
        }
    }

    /// Path as the host resolves it: a leading `./` becomes `mod:`.
    pub fn patch_src(&self) -> String {
        match self.path.strip_prefix("./") {
            Some(rest) => format!("mod:{rest}"),
            None => self.path.clone(),
        }
    }

    pub fn patch_step(&self) -> PatchStep {
        let src = self.patch_src();
        match self.kind {
            UnitKind::Standard(_) | UnitKind::Import => PatchStep::Import { src },
            UnitKind::Include => PatchStep::Include { src },
        }
    }
}

/// All units of a run, in registration order, keyed by title.
#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: Vec<EventUnit>,
    by_title: HashMap<String, usize>,
}

impl UnitRegistry {
    /// # Errors
    /// [`ScriptError::DuplicateTitle`] if a unit with the same title exists.
    pub fn register(&mut self, unit: EventUnit) -> Result<(), ScriptError> {
        if self.by_title.contains_key(unit.title()) {
            return Err(ScriptError::DuplicateTitle(unit.title));
        }
        self.by_title.insert(unit.title.clone(), self.units.len());
        self.units.push(unit);
        Ok(())
    }

    pub fn contains(&self, title: &str) -> bool {
        self.by_title.contains_key(title)
    }

    pub fn get(&self, title: &str) -> Option<&EventUnit> {
        self.by_title.get(title).map(|&idx| &self.units[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventUnit> {
        self.units.iter()
    }

    /// Standard units only, with their documents.
    pub fn events(&self) -> impl Iterator<Item = (&EventUnit, &CommonEvent)> {
        self.units.iter().filter_map(|unit| unit.event().map(|event| (unit, event)))
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Load instructions for every unit, wrapped in the enter/exit pair that
    /// points the host at its common-event table.
    pub fn manifest(&self) -> Vec<PatchStep> {
        let mut steps = Vec::with_capacity(self.units.len() + 2);
        steps.push(PatchStep::Enter {
            index: COMMON_EVENTS_INDEX.to_string(),
        });
        steps.extend(self.units.iter().map(EventUnit::patch_step));
        steps.push(PatchStep::Exit);
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn paths_and_sources() {
        let unit = EventUnit::standard("lea.greeting", CommonEvent::default()).unwrap();
        assert_eq!(unit.path(), "./patches/lea.greeting.json");
        assert_eq!(unit.patch_src(), "mod:patches/lea.greeting.json");

        let unit = EventUnit::include("extra", r"lib\deep\", Some("patch")).unwrap();
        assert_eq!(unit.path(), "./patches/lib/deep/extra.patch");
        assert_eq!(unit.title(), "extra");
        assert!(unit.event().is_none());
    }

    #[test]
    fn invalid_title_is_rejected() {
        let err = EventUnit::standard("has space", CommonEvent::default()).unwrap_err();
        assert_eq!(err, ScriptError::InvalidPath("./patches/has space.json".into()));
    }

    #[test]
    fn duplicate_titles_are_rejected() {
        let mut registry = UnitRegistry::default();
        registry
            .register(EventUnit::standard("foo", CommonEvent::default()).unwrap())
            .unwrap();
        let err = registry
            .register(EventUnit::import("foo", "", None).unwrap())
            .unwrap_err();
        assert_eq!(err, ScriptError::DuplicateTitle("foo".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn manifest_keeps_registration_order() {
        let mut registry = UnitRegistry::default();
        registry.register(EventUnit::include("base", "", None).unwrap()).unwrap();
        registry
            .register(EventUnit::standard("b", CommonEvent::default()).unwrap())
            .unwrap();
        registry.register(EventUnit::import("a", "shared/", None).unwrap()).unwrap();
        assert_eq!(
            serde_json::to_value(registry.manifest()).unwrap(),
            json!([
                {"type": "ENTER", "index": "commonEvents"},
                {"type": "INCLUDE", "src": "mod:patches/base.json"},
                {"type": "IMPORT", "src": "mod:patches/b.json"},
                {"type": "IMPORT", "src": "mod:patches/shared/a.json"},
                {"type": "EXIT"},
            ])
        );
        assert_eq!(registry.events().count(), 1);
    }

    #[test]
    fn empty_manifest_is_just_the_brackets() {
        assert_eq!(
            UnitRegistry::default().manifest(),
            vec![
                PatchStep::Enter {
                    index: "commonEvents".into()
                },
                PatchStep::Exit
            ]
        );
    }
}
