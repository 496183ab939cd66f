//! Recursive block builder for event steps.

use cces_data::{ChangeVariable, Character, Conditional, EventStep, Message, Wait};

use super::statement::{Statement, classify};
use super::{ParseError, ParseMode, ScriptError, ScriptParser};

impl ScriptParser<'_> {
    /// Parse steps until the block ends.
    ///
    /// In [`ParseMode::Event`] the block ends at end of input or at a header,
    /// title or directive line, which is handed back to the caller. In the
    /// conditional modes it ends at `else`/`endif`, which is also handed back
    /// so [`parse_conditional`](Self::parse_conditional) can consume it.
    pub(super) fn parse_block(&mut self, mode: ParseMode) -> Result<Vec<EventStep>, ParseError> {
        let mut steps = Vec::new();
        loop {
            self.source.mark()?;
            let Some(line) = self.source.next_line() else {
                return match mode {
                    ParseMode::If { opened_at } | ParseMode::Else { opened_at } => {
                        Err(ParseError::script(opened_at, ScriptError::UnterminatedIf { opened_at }))
                    },
                    ParseMode::Normal | ParseMode::Event => Ok(steps),
                };
            };
            let at = |kind: ScriptError| ParseError::script(line.number, kind);

            match classify(&line.text) {
                Statement::If(condition) => {
                    steps.push(self.parse_conditional(condition, line.number)?);
                },
                Statement::Else => match mode {
                    ParseMode::If { .. } => {
                        self.source.rewind()?;
                        return Ok(steps);
                    },
                    ParseMode::Else { .. } => return Err(at(ScriptError::DuplicateElse)),
                    ParseMode::Normal | ParseMode::Event => return Err(at(ScriptError::ElseWithoutIf)),
                },
                Statement::Endif => match mode {
                    ParseMode::If { .. } | ParseMode::Else { .. } => {
                        self.source.rewind()?;
                        return Ok(steps);
                    },
                    ParseMode::Normal | ParseMode::Event => return Err(at(ScriptError::EndifWithoutIf)),
                },
                Statement::Directive { kind, .. } if mode.in_conditional() => {
                    return Err(at(ScriptError::DirectiveAfterTitle(kind)));
                },
                stmt if stmt.is_structural() => match mode {
                    ParseMode::If { opened_at } | ParseMode::Else { opened_at } => {
                        return Err(ParseError::script(opened_at, ScriptError::UnterminatedIf { opened_at }));
                    },
                    ParseMode::Normal | ParseMode::Event => {
                        self.source.rewind()?;
                        return Ok(steps);
                    },
                },
                Statement::Label(name) => steps.push(EventStep::Label { name }),
                Statement::Goto { label, condition } => steps.push(match condition {
                    Some(condition) => EventStep::GotoWhile { name: label, condition },
                    None => EventStep::Goto { name: label },
                }),
                Statement::SetBool { name, op, value } => {
                    let change = ChangeVariable::boolean(name, value, op).map_err(|e| at(e.into()))?;
                    steps.push(change.into());
                },
                Statement::SetNumber { name, op, value } => {
                    steps.push(ChangeVariable::number(name, value, op).into());
                },
                Statement::Wait {
                    seconds,
                    ignore_slowdown,
                } => steps.push(EventStep::Wait(Wait {
                    seconds,
                    ignore_slowdown,
                })),
                Statement::Dialogue {
                    character,
                    expression,
                    text,
                } => {
                    let speaker = Character::new(character, expression, self.roster);
                    steps.push(Message::side(speaker, text).into());
                },
                _ => {
                    return Err(at(ScriptError::UnexpectedLine {
                        context: mode,
                        line: line.text,
                    }));
                },
            }
        }
    }

    /// Parse the branches of an `if` whose header was on line `opened_at`,
    /// consuming the closing `endif`.
    pub(super) fn parse_conditional(&mut self, condition: String, opened_at: usize) -> Result<EventStep, ParseError> {
        let unterminated = || ParseError::script(opened_at, ScriptError::UnterminatedIf { opened_at });

        let then_steps = self.parse_block(ParseMode::If { opened_at })?;
        let terminator = self.source.next_line().map(|line| classify(&line.text));
        let cond = match terminator {
            Some(Statement::Endif) => Conditional::new(condition, then_steps),
            Some(Statement::Else) => {
                let else_steps = self.parse_block(ParseMode::Else { opened_at })?;
                match self.source.next_line().map(|line| classify(&line.text)) {
                    Some(Statement::Endif) => Conditional::with_else(condition, then_steps, else_steps),
                    _ => return Err(unterminated()),
                }
            },
            _ => return Err(unterminated()),
        };
        Ok(cond.into())
    }
}
