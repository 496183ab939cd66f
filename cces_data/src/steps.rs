//! Event steps: the nodes of a compiled common-event tree.
//!
//! Every step serializes to a JSON object whose first key is `type`, naming
//! the host engine's step kind, followed by that kind's fields. The shapes
//! here are what the host reads, and several of them are irregular
//! (see [`RandomChoice`]).

use std::fmt;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::roster::Roster;

/// Operation applied to a variable by a [`ChangeVariable`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeVarOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Or,
    Xor,
}

impl ChangeVarOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeVarOp::Set => "set",
            ChangeVarOp::Add => "add",
            ChangeVarOp::Sub => "sub",
            ChangeVarOp::Mul => "mul",
            ChangeVarOp::Div => "div",
            ChangeVarOp::Mod => "mod",
            ChangeVarOp::Or => "or",
            ChangeVarOp::Xor => "xor",
        }
    }

    /// Boolean variables only support `set`, `or` and `xor`.
    pub fn allowed_on_bool(self) -> bool {
        matches!(self, ChangeVarOp::Set | ChangeVarOp::Or | ChangeVarOp::Xor)
    }
}

impl fmt::Display for ChangeVarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while constructing steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    IllegalOperation { var: String, op: ChangeVarOp },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepError::IllegalOperation { var, op } => {
                write!(f, "operation '{op}' cannot be applied to boolean variable '{var}'")
            },
        }
    }
}

impl std::error::Error for StepError {}

/// Value written by a variable change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarValue {
    Bool(bool),
    Number(i64),
}

/// A mutation of a named game variable.
///
/// Fields are private so that a boolean change can never carry an
/// arithmetic operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeVariable {
    name: String,
    value: VarValue,
    op: ChangeVarOp,
}

impl ChangeVariable {
    /// Build a change, rejecting operations that are illegal for the value's type.
    ///
    /// # Errors
    /// Returns [`StepError::IllegalOperation`] for a boolean value combined with
    /// an arithmetic operation.
    pub fn new(name: impl Into<String>, value: VarValue, op: ChangeVarOp) -> Result<Self, StepError> {
        let name = name.into();
        if matches!(value, VarValue::Bool(_)) && !op.allowed_on_bool() {
            return Err(StepError::IllegalOperation { var: name, op });
        }
        Ok(Self { name, value, op })
    }

    /// Numeric changes accept every operation.
    pub fn number(name: impl Into<String>, value: i64, op: ChangeVarOp) -> Self {
        Self {
            name: name.into(),
            value: VarValue::Number(value),
            op,
        }
    }

    /// # Errors
    /// Returns [`StepError::IllegalOperation`] unless `op` is `set`, `or` or `xor`.
    pub fn boolean(name: impl Into<String>, value: bool, op: ChangeVarOp) -> Result<Self, StepError> {
        Self::new(name, VarValue::Bool(value), op)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> VarValue {
        self.value
    }

    pub fn op(&self) -> ChangeVarOp {
        self.op
    }
}

impl Serialize for ChangeVariable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("ChangeVariable", 4)?;
        match self.value {
            VarValue::Bool(value) => {
                st.serialize_field("type", "CHANGE_VAR_BOOL")?;
                st.serialize_field("changeType", &self.op)?;
                st.serialize_field("varName", &self.name)?;
                st.serialize_field("value", &value)?;
            },
            VarValue::Number(value) => {
                st.serialize_field("type", "CHANGE_VAR_NUMBER")?;
                st.serialize_field("changeType", &self.op)?;
                st.serialize_field("varName", &self.name)?;
                st.serialize_field("value", &value)?;
            },
        }
        st.end()
    }
}

/// A speaking character as the host identifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Character {
    display_name: String,
    expression: String,
    internal_id: String,
}

impl Character {
    /// Resolve `display_name` through the roster. Names the roster does not
    /// know are used (lowercased and trimmed) as the internal id.
    pub fn new(display_name: impl Into<String>, expression: impl Into<String>, roster: &Roster) -> Self {
        let display_name = display_name.into();
        let internal_id = roster.resolve(&display_name);
        Self {
            display_name,
            expression: expression.into(),
            internal_id,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn internal_id(&self) -> &str {
        &self.internal_id
    }
}

impl Serialize for Character {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("Person", 2)?;
        st.serialize_field("person", &self.internal_id)?;
        st.serialize_field("expression", &self.expression)?;
        st.end()
    }
}

/// Localized text; only the English entry is produced.
struct LangLabel<'a>(&'a str);

impl Serialize for LangLabel<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("LangLabel", 1)?;
        st.serialize_field("en_US", self.0)?;
        st.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Non-blocking message shown at the side of the screen.
    Side,
    /// Blocking dialogue box.
    Blocking { auto_continue: bool },
}

/// A line of dialogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub speaker: Character,
    pub text: String,
    pub kind: MessageKind,
}

impl Message {
    pub fn side(speaker: Character, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            kind: MessageKind::Side,
        }
    }

    pub fn blocking(speaker: Character, text: impl Into<String>, auto_continue: bool) -> Self {
        Self {
            speaker,
            text: text.into(),
            kind: MessageKind::Blocking { auto_continue },
        }
    }

    pub fn is_side(&self) -> bool {
        self.kind == MessageKind::Side
    }

    pub fn auto_continue(&self) -> bool {
        matches!(self.kind, MessageKind::Blocking { auto_continue: true })
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("Message", 4)?;
        match self.kind {
            MessageKind::Side => {
                st.serialize_field("type", "SHOW_SIDE_MSG")?;
                st.serialize_field("message", &LangLabel(&self.text))?;
                st.serialize_field("person", &self.speaker)?;
            },
            MessageKind::Blocking { auto_continue } => {
                st.serialize_field("type", "SHOW_MSG")?;
                st.serialize_field("message", &LangLabel(&self.text))?;
                st.serialize_field("person", &self.speaker)?;
                st.serialize_field("autoContinue", &auto_continue)?;
            },
        }
        st.end()
    }
}

/// An `if` block. The else branch is `Some` whenever the source had an
/// `else`, even an empty one.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub condition: String,
    pub then_steps: Vec<EventStep>,
    pub else_steps: Option<Vec<EventStep>>,
}

impl Conditional {
    pub fn new(condition: impl Into<String>, then_steps: Vec<EventStep>) -> Self {
        Self {
            condition: condition.into(),
            then_steps,
            else_steps: None,
        }
    }

    pub fn with_else(condition: impl Into<String>, then_steps: Vec<EventStep>, else_steps: Vec<EventStep>) -> Self {
        Self {
            condition: condition.into(),
            then_steps,
            else_steps: Some(else_steps),
        }
    }

    pub fn has_else(&self) -> bool {
        self.else_steps.is_some()
    }
}

impl Serialize for Conditional {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("Conditional", 5)?;
        st.serialize_field("type", "IF")?;
        st.serialize_field("withElse", &self.has_else())?;
        st.serialize_field("condition", &self.condition)?;
        st.serialize_field("thenStep", &self.then_steps)?;
        match &self.else_steps {
            Some(steps) => st.serialize_field("elseStep", steps)?,
            None => st.skip_field("elseStep")?,
        }
        st.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wait {
    pub seconds: f64,
    pub ignore_slowdown: bool,
}

impl Serialize for Wait {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("Wait", 3)?;
        st.serialize_field("type", "WAIT")?;
        st.serialize_field("time", &self.seconds)?;
        st.serialize_field("ignoreSlowDown", &self.ignore_slowdown)?;
        st.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScreenSide {
    Left,
    Right,
}

/// Brings a character portrait on screen for subsequent messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddSpeaker {
    pub speaker: Character,
    pub side: ScreenSide,
    pub clear_side: bool,
    pub order: i64,
    pub display_name: Option<String>,
}

impl Serialize for AddSpeaker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("AddSpeaker", 6)?;
        st.serialize_field("type", "ADD_MSG_PERSON")?;
        st.serialize_field("side", &self.side)?;
        st.serialize_field("clearSide", &self.clear_side)?;
        st.serialize_field("order", &self.order)?;
        st.serialize_field("person", &self.speaker)?;
        match &self.display_name {
            Some(name) => st.serialize_field("customName", &LangLabel(name))?,
            None => st.skip_field("customName")?,
        }
        st.end()
    }
}

/// One weighted branch of a [`RandomChoice`].
#[derive(Debug, Clone, PartialEq)]
pub struct RandomOption {
    pub weight: i64,
    pub active_condition: Option<String>,
    pub steps: Vec<EventStep>,
}

/// Weighted random selection between step lists.
///
/// The host expects a flat object: an `options` summary of `{count, weight}`
/// per option, and one sibling key `"<option>_<step>"` per step, each holding
/// a single-step array.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomChoice {
    pub options: Vec<RandomOption>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OptionSummary<'a> {
    count: usize,
    weight: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_condition: Option<&'a str>,
}

impl Serialize for RandomChoice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let summaries: Vec<OptionSummary<'_>> = self
            .options
            .iter()
            .map(|opt| OptionSummary {
                count: opt.steps.len(),
                weight: opt.weight,
                active_condition: opt.active_condition.as_deref(),
            })
            .collect();
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", "RANDOM_CHOICE")?;
        map.serialize_entry("options", &summaries)?;
        for (i, opt) in self.options.iter().enumerate() {
            for (j, step) in opt.steps.iter().enumerate() {
                map.serialize_entry(&format!("{i}_{j}"), std::slice::from_ref(step))?;
            }
        }
        map.end()
    }
}

/// A single node of an event tree.
#[derive(Debug, Clone, PartialEq)]
pub enum EventStep {
    ChangeVariable(ChangeVariable),
    Message(Message),
    If(Conditional),
    Wait(Wait),
    AddSpeaker(AddSpeaker),
    RandomChoice(RandomChoice),
    Label { name: String },
    Goto { name: String },
    GotoWhile { name: String, condition: String },
}

impl EventStep {
    /// The host's name for this step, as written to the `type` key.
    pub fn type_name(&self) -> &'static str {
        match self {
            EventStep::ChangeVariable(change) => match change.value {
                VarValue::Bool(_) => "CHANGE_VAR_BOOL",
                VarValue::Number(_) => "CHANGE_VAR_NUMBER",
            },
            EventStep::Message(msg) => match msg.kind {
                MessageKind::Side => "SHOW_SIDE_MSG",
                MessageKind::Blocking { .. } => "SHOW_MSG",
            },
            EventStep::If(_) => "IF",
            EventStep::Wait(_) => "WAIT",
            EventStep::AddSpeaker(_) => "ADD_MSG_PERSON",
            EventStep::RandomChoice(_) => "RANDOM_CHOICE",
            EventStep::Label { .. } => "LABEL",
            EventStep::Goto { .. } => "GOTO_LABEL",
            EventStep::GotoWhile { .. } => "GOTO_LABEL_WHILE",
        }
    }
}

impl Serialize for EventStep {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EventStep::ChangeVariable(change) => change.serialize(serializer),
            EventStep::Message(msg) => msg.serialize(serializer),
            EventStep::If(cond) => cond.serialize(serializer),
            EventStep::Wait(wait) => wait.serialize(serializer),
            EventStep::AddSpeaker(add) => add.serialize(serializer),
            EventStep::RandomChoice(choice) => choice.serialize(serializer),
            EventStep::Label { name } | EventStep::Goto { name } => {
                let mut st = serializer.serialize_struct("Label", 2)?;
                st.serialize_field("type", self.type_name())?;
                st.serialize_field("name", name)?;
                st.end()
            },
            EventStep::GotoWhile { name, condition } => {
                let mut st = serializer.serialize_struct("GotoWhile", 3)?;
                st.serialize_field("type", self.type_name())?;
                st.serialize_field("name", name)?;
                st.serialize_field("condition", condition)?;
                st.end()
            },
        }
    }
}

impl From<ChangeVariable> for EventStep {
    fn from(change: ChangeVariable) -> Self {
        EventStep::ChangeVariable(change)
    }
}

impl From<Message> for EventStep {
    fn from(msg: Message) -> Self {
        EventStep::Message(msg)
    }
}

impl From<Conditional> for EventStep {
    fn from(cond: Conditional) -> Self {
        EventStep::If(cond)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lea() -> Character {
        Character::new("Lea", "HAPPY", &Roster::default())
    }

    #[test]
    fn bool_change_rejects_arithmetic() {
        let err = ChangeVariable::boolean("tmp.flag", true, ChangeVarOp::Add).unwrap_err();
        assert_eq!(
            err,
            StepError::IllegalOperation {
                var: "tmp.flag".into(),
                op: ChangeVarOp::Add
            }
        );
        assert!(ChangeVariable::boolean("tmp.flag", true, ChangeVarOp::Xor).is_ok());
        assert!(ChangeVariable::new("tmp.n", VarValue::Number(2), ChangeVarOp::Mod).is_ok());
    }

    #[test]
    fn change_var_shapes() {
        let b = ChangeVariable::boolean("tmp.test", true, ChangeVarOp::Set).unwrap();
        assert_eq!(
            serde_json::to_value(EventStep::from(b)).unwrap(),
            json!({"type": "CHANGE_VAR_BOOL", "changeType": "set", "varName": "tmp.test", "value": true})
        );
        let n = ChangeVariable::number("tmp.test", 3, ChangeVarOp::Add);
        assert_eq!(
            serde_json::to_value(EventStep::from(n)).unwrap(),
            json!({"type": "CHANGE_VAR_NUMBER", "changeType": "add", "varName": "tmp.test", "value": 3})
        );
    }

    #[test]
    fn side_message_has_no_auto_continue() {
        let msg = Message::side(Character::new("Emilie", "EXHAUSTED", &Roster::default()), "Uhm... whoops...");
        assert_eq!(
            serde_json::to_value(EventStep::from(msg)).unwrap(),
            json!({
                "type": "SHOW_SIDE_MSG",
                "message": {"en_US": "Uhm... whoops..."},
                "person": {"person": "main.emilie", "expression": "EXHAUSTED"}
            })
        );
    }

    #[test]
    fn blocking_message_carries_auto_continue() {
        let msg = Message::blocking(lea(), "Hi!", true);
        assert!(msg.auto_continue());
        let v = serde_json::to_value(EventStep::from(msg)).unwrap();
        assert_eq!(v["type"], "SHOW_MSG");
        assert_eq!(v["autoContinue"], true);
    }

    #[test]
    fn conditional_omits_else_key_when_absent() {
        let cond = Conditional::new("tmp.a", vec![EventStep::Label { name: "x".into() }]);
        let v = serde_json::to_value(&cond).unwrap();
        assert_eq!(v["withElse"], false);
        assert!(v.get("elseStep").is_none());

        let cond = Conditional::with_else("tmp.a", vec![], vec![]);
        let v = serde_json::to_value(&cond).unwrap();
        assert_eq!(v["withElse"], true);
        assert_eq!(v["elseStep"], json!([]));
    }

    #[test]
    fn type_key_is_first() {
        let step = EventStep::GotoWhile {
            name: "loop".into(),
            condition: "tmp.n < 3".into(),
        };
        let text = serde_json::to_string(&step).unwrap();
        assert!(text.starts_with(r#"{"type":"GOTO_LABEL_WHILE""#));
    }

    #[test]
    fn random_choice_flattens_option_steps() {
        let step = |name: &str| EventStep::Label { name: name.into() };
        let choice = RandomChoice {
            options: vec![
                RandomOption {
                    weight: 2,
                    active_condition: None,
                    steps: vec![step("a"), step("b")],
                },
                RandomOption {
                    weight: 1,
                    active_condition: None,
                    steps: vec![step("c")],
                },
            ],
        };
        let v = serde_json::to_value(EventStep::RandomChoice(choice)).unwrap();
        let obj = v.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["0_0", "0_1", "1_0", "options", "type"]);
        assert_eq!(v["options"], json!([{"count": 2, "weight": 2}, {"count": 1, "weight": 1}]));
        assert_eq!(v["0_1"], json!([{"type": "LABEL", "name": "b"}]));
        assert_eq!(v["1_0"], json!([{"type": "LABEL", "name": "c"}]));
    }

    #[test]
    fn add_speaker_custom_name_is_optional() {
        let add = AddSpeaker {
            speaker: lea(),
            side: ScreenSide::Left,
            clear_side: false,
            order: 0,
            display_name: None,
        };
        let v = serde_json::to_value(EventStep::AddSpeaker(add.clone())).unwrap();
        assert_eq!(v["side"], "LEFT");
        assert!(v.get("customName").is_none());

        let named = AddSpeaker {
            display_name: Some("???".into()),
            ..add
        };
        let v = serde_json::to_value(EventStep::AddSpeaker(named)).unwrap();
        assert_eq!(v["customName"], json!({"en_US": "???"}));
    }
}
