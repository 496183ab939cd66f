use cces_data::TypeValue;
use lazy_static::lazy_static;
use regex::Regex;

/// Root directory, relative to the mod folder, that every unit is written under.
pub const PATCHES_ROOT: &str = "./patches/";

lazy_static! {
    static ref OUTPUT_PATH_RE: Regex =
        Regex::new(r"^(?P<directory>(?:[.\w]+[\\/])*)(?P<filename>\S+)$").expect("output path regex");
}

/// Turn the two-character sequence `\n` into a real newline.
pub(crate) fn unescape_text(text: &str) -> String {
    text.replace("\\n", "\n")
}

/// Infer a `type` property value: integer list, string list, integer, or raw text.
pub(crate) fn parse_type_value(raw: &str) -> TypeValue {
    let raw = raw.trim();
    if raw.contains(',') {
        let parts: Vec<&str> = raw.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
        let ints: Result<Vec<i64>, _> = parts.iter().map(|p| p.parse::<i64>()).collect();
        return match ints {
            Ok(ints) => TypeValue::IntList(ints),
            Err(_) => TypeValue::TextList(parts.into_iter().map(str::to_string).collect()),
        };
    }
    match raw.parse::<i64>() {
        Ok(n) => TypeValue::Int(n),
        Err(_) => TypeValue::Text(raw.to_string()),
    }
}

/// Output path of a standard event with the given (already dotted) title.
pub(crate) fn title_output_path(title: &str) -> String {
    format!("{PATCHES_ROOT}{title}.json")
}

/// Output path of an import/include directive target.
pub(crate) fn directive_output_path(directory: &str, filename: &str, extension: Option<&str>) -> String {
    let ext = extension.unwrap_or("json");
    format!("{PATCHES_ROOT}{directory}{filename}.{ext}")
}

/// Whether `path` has the `dir/.../file` shape the host accepts.
pub fn is_valid_output_path(path: &str) -> bool {
    OUTPUT_PATH_RE.is_match(path)
}

/// Parse a `true`/`false` property value.
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
