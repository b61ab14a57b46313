use regex::Regex;
use lazy_static::lazy_static;
use crate::utils::{quote, error};
use crate::error::FlowflatError;

lazy_static! {
    pub static ref TOKEN_REGEX: Regex = Regex::new(
        r#"(-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?\b|"[^"\n]*"|[=;:,.{}()\[\]]|\b[A-Za-z_][A-Za-z0-9_]*\b|//[^\n]*|/\*(?s:.*?)\*/|\s+)"#
    ).unwrap();
    pub static ref TRIVIA_RX: Regex = Regex::new(r"^(?s://.*|/\*.*\*/|\s+)$").unwrap();
}

#[derive(Debug, PartialEq)]
pub struct Token {
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

/// Splits schema text into tokens, dropping whitespace and comments.
/// The last token is always an empty EOF marker.
pub fn tokenize_schema(text: &str) -> Result<Vec<Token>, FlowflatError> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut column = 1;
    let mut last_end = 0;

    for mat in TOKEN_REGEX.find_iter(text) {
        let start = mat.start();
        let end   = mat.end();
        let part  = mat.as_str();

        if start > last_end {
            let unexpected = &text[last_end..start];
            return Err(error(
                &format!("Syntax error: {}", quote(unexpected)),
                line,
                column,
            ));
        }

        if !TRIVIA_RX.is_match(part) {
            tokens.push(Token {
                text:   part.to_string(),
                line,
                column,
            });
        }

        let newline_count = part.matches('\n').count();
        if newline_count > 0 {
            line += newline_count;
            if let Some(last_line_part) = part.split('\n').last() {
                column = last_line_part.len() + 1;
            }
        } else {
            column += part.len();
        }

        last_end = end;
    }

    if last_end != text.len() {
        let unexpected = &text[last_end..];
        return Err(error(
            &format!("Syntax error: {}", quote(unexpected)),
            line,
            column,
        ));
    }

    tokens.push(Token {
        text:   "".to_string(),
        line,
        column,
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        tokenize_schema(input)
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_tokenize_field() {
        let input = "x: int = 10;";
        let expected = vec![
            Token { text: "x".into(),   line: 1, column: 1 },
            Token { text: ":".into(),   line: 1, column: 2 },
            Token { text: "int".into(), line: 1, column: 4 },
            Token { text: "=".into(),   line: 1, column: 8 },
            Token { text: "10".into(),  line: 1, column: 10 },
            Token { text: ";".into(),   line: 1, column: 12 },
            Token { text: "".into(),    line: 1, column: 13 },
        ];
        let got = tokenize_schema(input).unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_tokenize_literals_and_paths() {
        assert_eq!(
            texts(r#"a.b.T -1.5e3 "MONS" [ubyte]"#),
            vec!["a", ".", "b", ".", "T", "-1.5e3", "\"MONS\"", "[", "ubyte", "]", ""]
        );
    }

    #[test]
    fn test_tokenize_skips_comments_and_tracks_lines() {
        let input = "// header\ntable /* inline\n comment */ T";
        let got = tokenize_schema(input).unwrap();
        assert_eq!(got[0], Token { text: "table".into(), line: 2, column: 1 });
        assert_eq!(got[1], Token { text: "T".into(), line: 3, column: 13 });
        assert_eq!(got[2].text, "");
    }

    #[test]
    fn test_tokenize_unexpected_text() {
        let input = "x: int = 10 @";
        let err = tokenize_schema(input).unwrap_err();
        assert!(
            matches!(err, FlowflatError::ParseError { line: 1, column: 13, .. }),
            "expected a ParseError but got {:?}",
            err
        );
    }
}
