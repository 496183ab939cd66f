//! Character roster: maps readable character names to the host's internal ids.

use std::collections::BTreeMap;

/// Built-in characters known to the host game.
const BUILTIN_CHARACTERS: &[(&str, &str)] = &[
    ("lea", "main.lea"),
    ("emilie", "main.emilie"),
    ("c'tron", "main.glasses"),
    ("apollo", "antagonists.fancyguy"),
    ("joern", "antagonists.sidekick"),
    ("shizuka", "main.shizuka"),
    ("lukas", "main.schneider"),
    ("schneider", "main.schneider"),
    ("luke", "main.luke"),
    ("sergey", "main.sergey"),
    ("sergey (avatar)", "main.sergey-av"),
    ("beowulf", "main.grumpy"),
    ("buggy", "main.buggy"),
    ("hlin", "main.guild-leader"),
];

/// Case-insensitive lookup table from display names to internal ids.
///
/// ```
/// use cces_data::Roster;
///
/// let roster = Roster::default().with_entries([("Glitch", "custom.glitch")]);
/// assert_eq!(roster.resolve("  LEA "), "main.lea");
/// assert_eq!(roster.resolve("glitch"), "custom.glitch");
/// assert_eq!(roster.resolve("Stranger"), "stranger");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    entries: BTreeMap<String, String>,
}

impl Roster {
    /// A roster with no entries; every name resolves to itself.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add or replace entries, returning the extended roster.
    pub fn with_entries<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, id) in entries {
            self.insert(name.as_ref(), id);
        }
        self
    }

    pub fn insert(&mut self, name: &str, internal_id: impl Into<String>) {
        self.entries.insert(normalize(name), internal_id.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(&normalize(name)).map(String::as_str)
    }

    /// Resolve a display name. Unknown names pass through lowercased and
    /// trimmed so custom characters can be referenced by id directly.
    pub fn resolve(&self, name: &str) -> String {
        let key = normalize(name);
        match self.entries.get(&key) {
            Some(id) => id.clone(),
            None => key,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::empty().with_entries(BUILTIN_CHARACTERS.iter().copied())
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_aliases_share_ids() {
        let roster = Roster::default();
        assert_eq!(roster.resolve("Lukas"), "main.schneider");
        assert_eq!(roster.resolve("Schneider"), "main.schneider");
        assert_eq!(roster.resolve("Sergey (Avatar)"), "main.sergey-av");
        assert_eq!(roster.len(), BUILTIN_CHARACTERS.len());
    }

    #[test]
    fn overrides_replace_builtins() {
        let roster = Roster::default().with_entries([("LEA", "custom.lea")]);
        assert_eq!(roster.get("lea"), Some("custom.lea"));
    }

    #[test]
    fn empty_roster_passes_names_through() {
        let roster = Roster::empty();
        assert!(roster.is_empty());
        assert_eq!(roster.resolve(" Lea "), "lea");
    }
}
