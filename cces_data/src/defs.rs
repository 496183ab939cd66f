use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::steps::{Conditional, EventStep};

/// Index name of the host table that compiled events are spliced into.
pub const COMMON_EVENTS_INDEX: &str = "commonEvents";

/// Condition guarding the steps of numbered sub-event `index`.
pub fn trigger_condition(index: u32) -> String {
    format!("trigger.count == {index}")
}

/// Value of one entry in a common event's free-form `type` map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeValue {
    Int(i64),
    Text(String),
    IntList(Vec<i64>),
    TextList(Vec<String>),
}

/// `type` map used when the source supplies no `type` properties.
pub fn default_event_kind() -> BTreeMap<String, TypeValue> {
    BTreeMap::from([
        ("killCount".to_string(), TypeValue::Int(0)),
        ("type".to_string(), TypeValue::Text("BATTLE_OVER".to_string())),
    ])
}

/// Top-level compiled document for one named common event.
///
/// Each numbered sub-event is stored as a synthetic [`Conditional`] guarded
/// by [`trigger_condition`], keyed by its trigger index.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonEvent {
    pub frequency: String,
    pub repeat: String,
    pub condition: String,
    pub event_type: String,
    pub triggers: BTreeMap<u32, Conditional>,
    pub override_side_message: bool,
    pub loop_count: i64,
    pub kind: BTreeMap<String, TypeValue>,
}

impl Default for CommonEvent {
    fn default() -> Self {
        Self {
            frequency: "REGULAR".to_string(),
            repeat: "ONCE".to_string(),
            condition: "true".to_string(),
            event_type: "PARALLEL".to_string(),
            triggers: BTreeMap::new(),
            override_side_message: false,
            loop_count: 3,
            kind: default_event_kind(),
        }
    }
}

impl CommonEvent {
    /// Add the steps for trigger `index`. Returns `false`, leaving the event
    /// unchanged, if that index is already taken.
    pub fn add_trigger(&mut self, index: u32, steps: Vec<EventStep>) -> bool {
        if self.triggers.contains_key(&index) {
            return false;
        }
        self.triggers
            .insert(index, Conditional::new(trigger_condition(index), steps));
        true
    }

    pub fn trigger(&self, index: u32) -> Option<&Conditional> {
        self.triggers.get(&index)
    }
}

impl Serialize for CommonEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let run_on_trigger: Vec<u32> = self.triggers.keys().copied().collect();
        let events: Vec<&Conditional> = self.triggers.values().collect();
        let mut st = serializer.serialize_struct("CommonEvent", 9)?;
        st.serialize_field("frequency", &self.frequency)?;
        st.serialize_field("repeat", &self.repeat)?;
        st.serialize_field("condition", &self.condition)?;
        st.serialize_field("eventType", &self.event_type)?;
        st.serialize_field("runOnTrigger", &run_on_trigger)?;
        st.serialize_field("event", &events)?;
        st.serialize_field("overrideSideMessage", &self.override_side_message)?;
        st.serialize_field("loopCount", &self.loop_count)?;
        st.serialize_field("type", &self.kind)?;
        st.end()
    }
}

/// One instruction of the host's database patch format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatchStep {
    Enter { index: String },
    Import { src: String },
    Include { src: String },
    Exit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::{ChangeVarOp, ChangeVariable};
    use serde_json::json;

    #[test]
    fn default_document_shape() {
        let v = serde_json::to_value(CommonEvent::default()).unwrap();
        assert_eq!(
            v,
            json!({
                "frequency": "REGULAR",
                "repeat": "ONCE",
                "condition": "true",
                "eventType": "PARALLEL",
                "runOnTrigger": [],
                "event": [],
                "overrideSideMessage": false,
                "loopCount": 3,
                "type": {"killCount": 0, "type": "BATTLE_OVER"}
            })
        );
    }

    #[test]
    fn triggers_emit_in_index_order() {
        let mut event = CommonEvent::default();
        assert!(event.add_trigger(2, vec![]));
        assert!(event.add_trigger(1, vec![ChangeVariable::number("tmp.n", 1, ChangeVarOp::Set).into()]));
        assert!(!event.add_trigger(2, vec![]));
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["runOnTrigger"], json!([1, 2]));
        assert_eq!(v["event"][0]["condition"], "trigger.count == 1");
        assert_eq!(v["event"][0]["thenStep"][0]["varName"], "tmp.n");
        assert_eq!(v["event"][1]["condition"], "trigger.count == 2");
    }

    #[test]
    fn patch_steps_are_tagged() {
        let steps = vec![
            PatchStep::Enter {
                index: COMMON_EVENTS_INDEX.into(),
            },
            PatchStep::Include {
                src: "mod:patches/a.json".into(),
            },
            PatchStep::Exit,
        ];
        assert_eq!(
            serde_json::to_value(&steps).unwrap(),
            json!([
                {"type": "ENTER", "index": "commonEvents"},
                {"type": "INCLUDE", "src": "mod:patches/a.json"},
                {"type": "EXIT"}
            ])
        );
    }

    #[test]
    fn type_values_are_untagged() {
        let v = serde_json::to_value(TypeValue::IntList(vec![1, 2])).unwrap();
        assert_eq!(v, json!([1, 2]));
        let v = serde_json::to_value(TypeValue::Text("x".into())).unwrap();
        assert_eq!(v, json!("x"));
    }
}
