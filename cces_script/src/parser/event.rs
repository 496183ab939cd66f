//! Common-event assembler: collects property lines and numbered sub-events
//! into a [`CommonEvent`].

use std::collections::BTreeMap;

use cces_data::{CommonEvent, EventStep, TypeValue};

use super::ScriptError;
use super::helpers::{parse_bool, parse_type_value};

#[derive(Debug, Default)]
pub(crate) struct EventBuilder {
    event: CommonEvent,
    kind: BTreeMap<String, TypeValue>,
}

impl EventBuilder {
    /// Apply a `key: value` line. Later lines overwrite earlier ones.
    pub(crate) fn set_property(&mut self, key: &str, value: &str) -> Result<(), ScriptError> {
        let invalid = || ScriptError::InvalidPropertyValue {
            property: key.to_string(),
            value: value.to_string(),
        };
        match key.to_ascii_lowercase().as_str() {
            "frequency" => self.event.frequency = value.to_string(),
            "repeat" => self.event.repeat = value.to_string(),
            "condition" => self.event.condition = value.to_string(),
            "eventtype" => self.event.event_type = value.to_string(),
            "loopcount" => self.event.loop_count = value.parse().map_err(|_| invalid())?,
            "overridesidemessage" => self.event.override_side_message = parse_bool(value).ok_or_else(invalid)?,
            _ => return Err(ScriptError::UnknownProperty(key.to_string())),
        }
        Ok(())
    }

    /// Apply a `type.key: value` line, or `type: value` when `key` is `None`.
    pub(crate) fn set_type_property(&mut self, key: Option<&str>, value: &str) {
        match key {
            Some(key) => {
                self.kind.insert(key.to_string(), parse_type_value(value));
            },
            None => {
                self.kind
                    .insert("type".to_string(), TypeValue::Text(value.trim().to_string()));
            },
        }
    }

    pub(crate) fn add_trigger(&mut self, index: u32, steps: Vec<EventStep>) -> Result<(), ScriptError> {
        if self.event.add_trigger(index, steps) {
            Ok(())
        } else {
            Err(ScriptError::DuplicateTrigger(index))
        }
    }

    /// Finish the event; the default `type` map is kept only if no `type`
    /// property was supplied.
    pub(crate) fn finish(mut self) -> CommonEvent {
        if !self.kind.is_empty() {
            self.event.kind = self.kind;
        }
        self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cces_data::default_event_kind;

    #[test]
    fn later_properties_win() {
        let mut b = EventBuilder::default();
        b.set_property("frequency", "PERIODIC").unwrap();
        b.set_property("FREQUENCY", "REGULAR").unwrap();
        b.set_property("loopCount", "7").unwrap();
        b.set_property("overrideSideMessage", "true").unwrap();
        let event = b.finish();
        assert_eq!(event.frequency, "REGULAR");
        assert_eq!(event.loop_count, 7);
        assert!(event.override_side_message);
        assert_eq!(event.kind, default_event_kind());
    }

    #[test]
    fn unknown_and_invalid_properties_fail() {
        let mut b = EventBuilder::default();
        assert_eq!(
            b.set_property("colour", "red"),
            Err(ScriptError::UnknownProperty("colour".into()))
        );
        assert!(matches!(
            b.set_property("loopCount", "many"),
            Err(ScriptError::InvalidPropertyValue { .. })
        ));
    }

    #[test]
    fn type_properties_replace_default() {
        let mut b = EventBuilder::default();
        b.set_type_property(None, "ENEMY_KILLED");
        b.set_type_property(Some("enemies"), "1, 2");
        let event = b.finish();
        assert_eq!(event.kind.len(), 2);
        assert_eq!(event.kind["type"], TypeValue::Text("ENEMY_KILLED".into()));
        assert_eq!(event.kind["enemies"], TypeValue::IntList(vec![1, 2]));
    }

    #[test]
    fn duplicate_trigger_index_fails() {
        let mut b = EventBuilder::default();
        b.add_trigger(1, vec![]).unwrap();
        assert_eq!(b.add_trigger(1, vec![]), Err(ScriptError::DuplicateTrigger(1)));
    }
}
