//! Lexical line source for eventscript files.
//!
//! Strips comments, trims whitespace and drops blank lines, remembering each
//! surviving line's 1-based position in the input text. The block parser
//! reads one line ahead to find where a block ends; the single-slot mark lets
//! it hand that line back to its caller.

/// A non-blank, comment-free, trimmed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based line number in the input text.
    pub number: usize,
    pub text: String,
}

/// Misuse of the line source by the parser itself, never caused by input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("rewind requested without a mark")]
    RewindWithoutMark,
    #[error("mark set twice without consuming a line")]
    DoubleMark,
}

#[derive(Debug, Clone)]
pub struct LineSource {
    lines: Vec<SourceLine>,
    cursor: usize,
    mark: Option<usize>,
}

impl LineSource {
    pub fn new(text: &str) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .filter_map(|(idx, raw)| {
                let text = strip_comment(raw).trim();
                (!text.is_empty()).then(|| SourceLine {
                    number: idx + 1,
                    text: text.to_string(),
                })
            })
            .collect();
        Self {
            lines,
            cursor: 0,
            mark: None,
        }
    }

    /// Consume the next line, or `None` at end of input. Reaching the end
    /// drops any pending mark since there is no line to hand back.
    pub fn next_line(&mut self) -> Option<SourceLine> {
        let Some(line) = self.lines.get(self.cursor).cloned() else {
            self.mark = None;
            return None;
        };
        self.cursor += 1;
        Some(line)
    }

    /// Remember the current position for a later [`rewind`](Self::rewind).
    ///
    /// A newer mark replaces an older one once a line has been consumed.
    ///
    /// # Errors
    /// [`UsageError::DoubleMark`] if a mark is already set at this position.
    pub fn mark(&mut self) -> Result<(), UsageError> {
        if self.mark == Some(self.cursor) {
            return Err(UsageError::DoubleMark);
        }
        self.mark = Some(self.cursor);
        Ok(())
    }

    /// Return to the marked position, clearing the mark.
    ///
    /// # Errors
    /// [`UsageError::RewindWithoutMark`] if no mark is set.
    pub fn rewind(&mut self) -> Result<(), UsageError> {
        let pos = self.mark.take().ok_or(UsageError::RewindWithoutMark)?;
        self.cursor = pos;
        Ok(())
    }

    /// Line number of the most recently consumed line (0 before the first).
    pub fn current_line_number(&self) -> usize {
        self.cursor
            .checked_sub(1)
            .and_then(|idx| self.lines.get(idx))
            .map_or(0, |line| line.number)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.lines.len()
    }
}

/// Cut a line at the first `#` or `//` whose preceding character is not a
/// backslash.
pub fn strip_comment(line: &str) -> &str {
    let mut prev = None;
    let mut chars = line.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        let escaped = prev == Some('\\');
        match ch {
            '#' if !escaped => return &line[..idx],
            '/' if !escaped && matches!(chars.peek(), Some((_, '/'))) => return &line[..idx],
            _ => {},
        }
        prev = Some(ch);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        let mut src = LineSource::new("# header\n\n  == intro ==  \n// note\nset a = 1 # trailing\n");
        let first = src.next_line().unwrap();
        assert_eq!(first.number, 3);
        assert_eq!(first.text, "== intro ==");
        let second = src.next_line().unwrap();
        assert_eq!(second.number, 5);
        assert_eq!(second.text, "set a = 1");
        assert!(src.next_line().is_none());
        assert!(src.is_exhausted());
    }

    #[test]
    fn escaped_markers_survive() {
        assert_eq!(strip_comment(r"Lea > HAPPY: number \#1"), r"Lea > HAPPY: number \#1");
        assert_eq!(strip_comment("a / b // c"), "a / b ");
        assert_eq!(strip_comment(r"a \\# b"), r"a \\# b");
        assert_eq!(strip_comment(r"a \// b"), r"a \// b");
        assert_eq!(strip_comment(r"url \/// rest"), r"url \/");
    }

    #[test]
    fn rewind_returns_the_peeked_line() {
        let mut src = LineSource::new("one\ntwo\nthree");
        src.next_line();
        src.mark().unwrap();
        assert_eq!(src.next_line().unwrap().text, "two");
        src.rewind().unwrap();
        assert_eq!(src.next_line().unwrap().text, "two");
        assert_eq!(src.current_line_number(), 2);
    }

    #[test]
    fn misuse_is_reported() {
        let mut src = LineSource::new("one\ntwo");
        assert_eq!(src.rewind(), Err(UsageError::RewindWithoutMark));
        src.mark().unwrap();
        assert_eq!(src.mark(), Err(UsageError::DoubleMark));
        src.next_line();
        src.mark().unwrap();
        src.rewind().unwrap();
        assert_eq!(src.rewind(), Err(UsageError::RewindWithoutMark));
    }

    #[test]
    fn end_of_input_drops_the_mark() {
        let mut src = LineSource::new("only");
        src.next_line();
        src.mark().unwrap();
        assert!(src.next_line().is_none());
        src.mark().unwrap();
    }
}
