use crate::error::FlowflatError;

/// Renders `text` as a JSON string literal, escaping anything unprintable.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

pub fn error(msg: &str, line: usize, column: usize) -> FlowflatError {
    FlowflatError::ParseError {
        msg: msg.to_string(),
        line,
        column,
    }
}

/// Joins a namespace path with `.`, the way schemas spell it.
pub fn dotted(path: &[String]) -> String {
    path.join(".")
}
