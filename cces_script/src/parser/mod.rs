//! Eventscript parser.
//!
//! A file is a preamble of `import`/`include` directives followed by titled
//! events. Each event holds property lines and numbered sub-events whose
//! bodies are parsed by the recursive block builder.

mod event;
mod helpers;
mod statement;
mod steps;

use std::fmt;

use cces_data::{EventStep, Roster, StepError};
use log::{debug, info, warn};

use crate::registry::{EventUnit, UnitRegistry};
use crate::source::{LineSource, UsageError};

use event::EventBuilder;
pub(crate) use helpers::{directive_output_path, title_output_path};
pub use helpers::{PATCHES_ROOT, is_valid_output_path};
pub use statement::{DirectiveKind, Statement, classify};

/// Malformed input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    #[error("'endif' without a matching 'if'")]
    EndifWithoutIf,
    #[error("'else' without a matching 'if'")]
    ElseWithoutIf,
    #[error("second 'else' in the same 'if'")]
    DuplicateElse,
    #[error("'if' opened on line {opened_at} is never closed")]
    UnterminatedIf { opened_at: usize },
    #[error("unexpected line in {context} context: '{line}'")]
    UnexpectedLine { context: ParseMode, line: String },
    #[error("unknown property '{0}'")]
    UnknownProperty(String),
    #[error("invalid value '{value}' for property '{property}'")]
    InvalidPropertyValue { property: String, value: String },
    #[error("duplicate title '{0}'")]
    DuplicateTitle(String),
    #[error("sub-event {0} is defined twice")]
    DuplicateTrigger(u32),
    #[error("'{0}' directives must come before the first title")]
    DirectiveAfterTitle(DirectiveKind),
    #[error("invalid output path '{0}'")]
    InvalidPath(String),
    #[error(transparent)]
    IllegalOperation(#[from] StepError),
}

/// Context the parser is in when it reads a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Normal,
    Event,
    If { opened_at: usize },
    Else { opened_at: usize },
}

impl ParseMode {
    pub fn in_conditional(self) -> bool {
        matches!(self, ParseMode::If { .. } | ParseMode::Else { .. })
    }
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseMode::Normal => f.write_str("top-level"),
            ParseMode::Event => f.write_str("event"),
            ParseMode::If { .. } => f.write_str("if"),
            ParseMode::Else { .. } => f.write_str("else"),
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectiveKind::Import => f.write_str("import"),
            DirectiveKind::Include => f.write_str("include"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: {kind}")]
    Script { line: usize, kind: ScriptError },
    #[error(transparent)]
    Usage(#[from] UsageError),
}

impl ParseError {
    pub fn script(line: usize, kind: ScriptError) -> Self {
        ParseError::Script { line, kind }
    }
}

/// Parser over one source text. Characters in dialogue lines are resolved
/// through the borrowed roster.
pub struct ScriptParser<'a> {
    source: LineSource,
    roster: &'a Roster,
}

impl<'a> ScriptParser<'a> {
    pub fn new(text: &str, roster: &'a Roster) -> Self {
        Self {
            source: LineSource::new(text),
            roster,
        }
    }

    /// Parse a whole file, registering every directive and standard event.
    ///
    /// # Errors
    /// The first [`ScriptError`] found, with its line number, or a
    /// [`UsageError`] if the parser misuses its line source.
    pub fn parse_into(&mut self, registry: &mut UnitRegistry) -> Result<(), ParseError> {
        let mut in_body = false;
        while let Some(line) = self.source.next_line() {
            let at = |kind: ScriptError| ParseError::script(line.number, kind);
            match classify(&line.text) {
                Statement::Directive {
                    kind,
                    directory,
                    filename,
                    extension,
                } => {
                    if in_body {
                        return Err(at(ScriptError::DirectiveAfterTitle(kind)));
                    }
                    let unit = match kind {
                        DirectiveKind::Import => EventUnit::import(&filename, &directory, extension.as_deref()),
                        DirectiveKind::Include => EventUnit::include(&filename, &directory, extension.as_deref()),
                    }
                    .map_err(at)?;
                    debug!("line {}: {kind} '{}'", line.number, unit.path());
                    registry.register(unit).map_err(at)?;
                },
                Statement::Title { title, skipped: true } => {
                    in_body = true;
                    info!("skipping event '{title}'");
                    self.skip_event()?;
                },
                Statement::Title { title, skipped: false } => {
                    in_body = true;
                    if registry.contains(&title) {
                        return Err(at(ScriptError::DuplicateTitle(title)));
                    }
                    let event = self.parse_event()?;
                    if event.triggers.is_empty() {
                        warn!("event '{title}' has no numbered sub-events");
                    }
                    let unit = EventUnit::standard(&title, event).map_err(at)?;
                    registry.register(unit).map_err(at)?;
                    debug!("line {}: registered event '{title}'", line.number);
                },
                _ => {
                    return Err(at(ScriptError::UnexpectedLine {
                        context: ParseMode::Normal,
                        line: line.text,
                    }));
                },
            }
        }
        Ok(())
    }

    /// Parse the body of a titled event up to the next title or end of input.
    ///
    /// # Errors
    /// Any error from the properties or the numbered sub-events.
    pub fn parse_event(&mut self) -> Result<cces_data::CommonEvent, ParseError> {
        let mut builder = EventBuilder::default();
        loop {
            self.source.mark()?;
            let Some(line) = self.source.next_line() else {
                break;
            };
            let at = |kind: ScriptError| ParseError::script(line.number, kind);
            match classify(&line.text) {
                Statement::Title { .. } => {
                    self.source.rewind()?;
                    break;
                },
                Statement::EventHeader(index) => {
                    let steps = self.parse_block(ParseMode::Event)?;
                    builder.add_trigger(index, steps).map_err(at)?;
                },
                Statement::TypeProperty { key, value } => builder.set_type_property(key.as_deref(), &value),
                Statement::Property { key, value } => builder.set_property(&key, &value).map_err(at)?,
                Statement::Directive { kind, .. } => return Err(at(ScriptError::DirectiveAfterTitle(kind))),
                Statement::Else => return Err(at(ScriptError::ElseWithoutIf)),
                Statement::Endif => return Err(at(ScriptError::EndifWithoutIf)),
                _ => {
                    return Err(at(ScriptError::UnexpectedLine {
                        context: ParseMode::Event,
                        line: line.text,
                    }));
                },
            }
        }
        Ok(builder.finish())
    }

    /// Parse a bare step list, as found in the body of one sub-event.
    ///
    /// # Errors
    /// Any [`ScriptError`] in the steps; a header or title line is also
    /// rejected since there is no event around it.
    pub fn parse_steps(&mut self) -> Result<Vec<EventStep>, ParseError> {
        let steps = self.parse_block(ParseMode::Event)?;
        match self.source.next_line() {
            Some(line) => Err(ParseError::script(
                line.number,
                ScriptError::UnexpectedLine {
                    context: ParseMode::Event,
                    line: line.text,
                },
            )),
            None => Ok(steps),
        }
    }

    /// Pass over the lines of a skipped event, leaving the next title unread.
    fn skip_event(&mut self) -> Result<(), UsageError> {
        loop {
            self.source.mark()?;
            let Some(line) = self.source.next_line() else {
                return Ok(());
            };
            if matches!(classify(&line.text), Statement::Title { .. }) {
                return self.source.rewind();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cces_data::{Conditional, trigger_condition};

    fn parse(src: &str) -> Result<UnitRegistry, ParseError> {
        let roster = Roster::default();
        let mut registry = UnitRegistry::default();
        ScriptParser::new(src, &roster).parse_into(&mut registry)?;
        Ok(registry)
    }

    #[test]
    fn sub_events_become_guarded_conditionals() {
        let registry = parse("== intro ==\nfrequency: PERIODIC\nmessage 2:\nlabel b\nmessage 1\nlabel a").unwrap();
        let event = registry.get("intro").and_then(EventUnit::event).unwrap();
        assert_eq!(event.frequency, "PERIODIC");
        assert_eq!(event.triggers.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(
            event.trigger(2),
            Some(&Conditional::new(
                trigger_condition(2),
                vec![EventStep::Label { name: "b".into() }]
            ))
        );
    }

    #[test]
    fn triggers_are_keyed_by_written_number() {
        let registry = parse("== a ==\nmessage 5\nlabel five\nmessage 2\nlabel two\nmessage 9\nlabel nine").unwrap();
        let event = registry.get("a").and_then(EventUnit::event).unwrap();
        let value = serde_json::to_value(event).unwrap();
        assert_eq!(value["runOnTrigger"], serde_json::json!([2, 5, 9]));
        let guards: Vec<&str> = value["event"]
            .as_array()
            .unwrap()
            .iter()
            .map(|cond| cond["condition"].as_str().unwrap())
            .collect();
        assert_eq!(guards, ["trigger.count == 2", "trigger.count == 5", "trigger.count == 9"]);
        assert_eq!(value["event"][0]["thenStep"][0]["name"], "two");
    }

    #[test]
    fn skipped_events_are_not_registered() {
        let registry = parse("==!draft==\nthis is not valid\nendif\n== kept ==\nmessage 1\nlabel a").unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("kept"));
        assert!(!registry.contains("draft"));
    }

    #[test]
    fn directives_only_in_preamble() {
        let registry = parse("import shared/common\ninclude extra.patch\n== a ==").unwrap();
        assert_eq!(registry.len(), 3);

        let err = parse("== a ==\nmessage 1\nlabel x\ninclude extra").unwrap_err();
        assert_eq!(err, ParseError::script(4, ScriptError::DirectiveAfterTitle(DirectiveKind::Include)));
        let err = parse("== a ==\n== b ==\nimport extra").unwrap_err();
        assert_eq!(err, ParseError::script(3, ScriptError::DirectiveAfterTitle(DirectiveKind::Import)));
    }

    #[test]
    fn duplicate_title_in_one_file() {
        let err = parse("== foo ==\n== foo ==").unwrap_err();
        assert_eq!(err, ParseError::script(2, ScriptError::DuplicateTitle("foo".into())));
    }

    #[test]
    fn duplicate_trigger_reports_header_line() {
        let err = parse("== a ==\nmessage 1\nlabel x\nmessage 1\nlabel y").unwrap_err();
        assert_eq!(err, ParseError::script(4, ScriptError::DuplicateTrigger(1)));
    }

    #[test]
    fn property_inside_sub_event_is_unexpected() {
        let err = parse("== a ==\nmessage 1\nrepeat: ONCE").unwrap_err();
        assert!(matches!(
            err,
            ParseError::Script {
                line: 3,
                kind: ScriptError::UnexpectedLine {
                    context: ParseMode::Event,
                    ..
                }
            }
        ));
    }

    #[test]
    fn stray_lines_outside_events() {
        let err = parse("label a").unwrap_err();
        assert!(matches!(
            err,
            ParseError::Script {
                line: 1,
                kind: ScriptError::UnexpectedLine {
                    context: ParseMode::Normal,
                    ..
                }
            }
        ));
        let err = parse("== a ==\nsome words").unwrap_err();
        assert!(matches!(
            err,
            ParseError::Script {
                kind: ScriptError::UnexpectedLine {
                    context: ParseMode::Event,
                    ..
                },
                ..
            }
        ));
    }

    #[test]
    fn parse_steps_rejects_headers() {
        let roster = Roster::default();
        let steps = ScriptParser::new("label a\ngoto a", &roster).parse_steps().unwrap();
        assert_eq!(steps.len(), 2);
        let err = ScriptParser::new("label a\nmessage 1", &roster).parse_steps().unwrap_err();
        assert!(matches!(err, ParseError::Script { line: 2, .. }));
    }

    #[test]
    fn error_messages_read_well() {
        let err = ParseError::script(7, ScriptError::UnterminatedIf { opened_at: 7 });
        assert_eq!(err.to_string(), "line 7: 'if' opened on line 7 is never closed");
        let err = ScriptError::DirectiveAfterTitle(DirectiveKind::Include);
        assert_eq!(err.to_string(), "'include' directives must come before the first title");
    }
}
