//! Line classifier.
//!
//! Each trimmed line is matched against the statement patterns in a fixed
//! priority order; the first match wins. Classification never fails: lines
//! that match nothing come back as [`Statement::Unknown`] and the block
//! parser decides whether that is an error in its current context.

use cces_data::ChangeVarOp;
use lazy_static::lazy_static;
use regex::Regex;

use super::helpers::unescape_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Import,
    Include,
}

/// A classified input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    If(String),
    Else,
    Endif,
    Label(String),
    Goto {
        label: String,
        condition: Option<String>,
    },
    SetBool {
        name: String,
        op: ChangeVarOp,
        value: bool,
    },
    SetNumber {
        name: String,
        op: ChangeVarOp,
        value: i64,
    },
    Wait {
        seconds: f64,
        ignore_slowdown: bool,
    },
    Dialogue {
        character: String,
        expression: String,
        text: String,
    },
    EventHeader(u32),
    Title {
        title: String,
        skipped: bool,
    },
    Directive {
        kind: DirectiveKind,
        directory: String,
        filename: String,
        extension: Option<String>,
    },
    TypeProperty {
        key: Option<String>,
        value: String,
    },
    Property {
        key: String,
        value: String,
    },
    Unknown,
}

lazy_static! {
    static ref IF_RE: Regex = Regex::new(r"(?i)^if\s+(?P<condition>.+)$").expect("if regex");
    static ref ELSE_RE: Regex = Regex::new(r"(?i)^else$").expect("else regex");
    static ref ENDIF_RE: Regex = Regex::new(r"(?i)^endif$").expect("endif regex");
    static ref LABEL_RE: Regex = Regex::new(r"(?i)^label\s+(?P<name>\S+)$").expect("label regex");
    static ref GOTO_RE: Regex =
        Regex::new(r"(?i)^goto\s+(?P<name>\S+)(?:\s+if\s+(?P<condition>.+))?$").expect("goto regex");
    static ref SET_BOOL_RE: Regex =
        Regex::new(r"(?i)^set\s+(?P<name>\S+?)\s*(?P<op>[=|^])\s*(?P<value>true|false)$").expect("set bool regex");
    static ref SET_NUM_RE: Regex =
        Regex::new(r"(?i)^set\s+(?P<name>\S+?)\s*(?P<op>[=+\-*/%|^])\s*(?P<value>-?\d+)$").expect("set num regex");
    static ref WAIT_RE: Regex =
        Regex::new(r"(?i)^wait\s+(?P<seconds>\d+(?:\.\d+)?|\.\d+)(?P<ignore>\s+ignore\s+slowdown)?$")
            .expect("wait regex");
    static ref DIALOGUE_RE: Regex =
        Regex::new(r"^(?P<character>[^:]+?)\s*>\s*(?P<expression>[A-Z\d_]+)[\s:](?P<text>.+)$").expect("dialogue regex");
    static ref HEADER_RE: Regex = Regex::new(r"(?i)^(?:message|event)\s+(?P<index>\d+):?$").expect("header regex");
    static ref TITLE_RE: Regex = Regex::new(r"^==\s*(?P<skip>!)?(?P<title>\S+)\s*==$").expect("title regex");
    static ref DIRECTIVE_RE: Regex = Regex::new(
        r"(?i)^(?P<kind>import|include)\s+(?:(?:\./)?patches/)?(?P<directory>(?:[.\w]+[\\/])*)(?P<filename>[\w+-]+)(?:\.(?P<ext>\w+))?$"
    )
    .expect("directive regex");
    static ref TYPE_PROPERTY_RE: Regex =
        Regex::new(r"(?i)^type(?:\.(?P<key>[^\s:]+))?\s*:\s*(?P<value>.+)$").expect("type property regex");
    static ref PROPERTY_RE: Regex = Regex::new(r"^(?P<key>\w+)\s*:\s*(?P<value>.+)$").expect("property regex");
}

/// Classify a single trimmed, comment-free line.
pub fn classify(line: &str) -> Statement {
    if let Some(caps) = IF_RE.captures(line) {
        return Statement::If(caps["condition"].trim().to_string());
    }
    if ELSE_RE.is_match(line) {
        return Statement::Else;
    }
    if ENDIF_RE.is_match(line) {
        return Statement::Endif;
    }
    if let Some(caps) = LABEL_RE.captures(line) {
        return Statement::Label(caps["name"].to_string());
    }
    if let Some(caps) = GOTO_RE.captures(line) {
        return Statement::Goto {
            label: caps["name"].to_string(),
            condition: caps.name("condition").map(|c| c.as_str().trim().to_string()),
        };
    }
    if let Some(caps) = SET_BOOL_RE.captures(line) {
        let op = match &caps["op"] {
            "|" => ChangeVarOp::Or,
            "^" => ChangeVarOp::Xor,
            _ => ChangeVarOp::Set,
        };
        return Statement::SetBool {
            name: caps["name"].to_string(),
            op,
            value: caps["value"].eq_ignore_ascii_case("true"),
        };
    }
    if let Some(caps) = SET_NUM_RE.captures(line)
        && let Ok(value) = caps["value"].parse::<i64>()
        && let Some((op, value)) = numeric_change(&caps["op"], value)
    {
        return Statement::SetNumber {
            name: caps["name"].to_string(),
            op,
            value,
        };
    }
    if let Some(caps) = WAIT_RE.captures(line)
        && let Ok(seconds) = caps["seconds"].parse::<f64>()
        && seconds.is_finite()
    {
        return Statement::Wait {
            seconds,
            ignore_slowdown: caps.name("ignore").is_some(),
        };
    }
    if let Some(caps) = DIALOGUE_RE.captures(line) {
        return Statement::Dialogue {
            character: caps["character"].trim().to_string(),
            expression: caps["expression"].to_string(),
            text: unescape_text(caps["text"].trim()),
        };
    }
    if let Some(caps) = HEADER_RE.captures(line)
        && let Ok(index) = caps["index"].parse::<u32>()
    {
        return Statement::EventHeader(index);
    }
    if let Some(caps) = TITLE_RE.captures(line) {
        return Statement::Title {
            title: caps["title"].replace('/', "."),
            skipped: caps.name("skip").is_some(),
        };
    }
    if let Some(caps) = DIRECTIVE_RE.captures(line) {
        let kind = if caps["kind"].eq_ignore_ascii_case("include") {
            DirectiveKind::Include
        } else {
            DirectiveKind::Import
        };
        return Statement::Directive {
            kind,
            directory: caps["directory"].replace('\\', "/"),
            filename: caps["filename"].to_string(),
            extension: caps.name("ext").map(|e| e.as_str().to_string()),
        };
    }
    if let Some(caps) = TYPE_PROPERTY_RE.captures(line) {
        return Statement::TypeProperty {
            key: caps.name("key").map(|k| k.as_str().to_string()),
            value: caps["value"].trim().to_string(),
        };
    }
    if let Some(caps) = PROPERTY_RE.captures(line) {
        return Statement::Property {
            key: caps["key"].to_string(),
            value: caps["value"].trim().to_string(),
        };
    }
    Statement::Unknown
}

/// Map a numeric `set` operator. Subtraction becomes an addition of the
/// negated value, which does not exist for `i64::MIN`.
fn numeric_change(op: &str, value: i64) -> Option<(ChangeVarOp, i64)> {
    let change = match op {
        "+" => (ChangeVarOp::Add, value),
        "-" => (ChangeVarOp::Add, value.checked_neg()?),
        "*" => (ChangeVarOp::Mul, value),
        "/" => (ChangeVarOp::Div, value),
        "%" => (ChangeVarOp::Mod, value),
        "|" => (ChangeVarOp::Or, value),
        "^" => (ChangeVarOp::Xor, value),
        _ => (ChangeVarOp::Set, value),
    };
    Some(change)
}

impl Statement {
    /// Lines that belong to an enclosing context and end any open sub-event.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Statement::EventHeader(_) | Statement::Title { .. } | Statement::Directive { .. }
        )
    }
}
