use super::ParseError;
use crate::NumberLit;

/// Decode a quoted string literal (single- or double-quoted) into its value.
/// Supports the `\n \r \t \\ \' \"` escapes; unknown escapes keep the
/// backslash.
pub(super) fn unescape(raw: &str) -> Result<String, ParseError> {
    let mut chars = raw.chars();
    let quote = chars.next().ok_or(ParseError::Shape("empty string literal"))?;
    if quote != '\'' && quote != '"' {
        return Err(ParseError::Shape("missing opening quote"));
    }
    let mut out = String::new();
    let mut escape = false;
    for ch in chars {
        if escape {
            match ch {
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                '\'' => out.push('\''),
                '"' => out.push('"'),
                '\\' => out.push('\\'),
                other => {
                    out.push('\\');
                    out.push(other);
                },
            }
            escape = false;
            continue;
        }
        match ch {
            '\\' => escape = true,
            c if c == quote => return Ok(out),
            c => out.push(c),
        }
    }
    Err(ParseError::Shape("missing closing quote"))
}

/// Parse a numeric literal as the narrowest exact type: `i64` when the text
/// has no fractional part, `f64` otherwise.
pub(super) fn parse_number(text: &str) -> Result<NumberLit, ParseError> {
    if text.contains('.') {
        text.parse::<f64>()
            .map(NumberLit::Float)
            .map_err(|_| ParseError::Shape("invalid numeric literal"))
    } else {
        text.parse::<i64>()
            .map(NumberLit::Int)
            .map_err(|_| ParseError::Shape("numeric literal out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_handles_both_quote_styles() {
        assert_eq!(unescape("'off'").unwrap(), "off");
        assert_eq!(unescape("\"line1\\nline2\"").unwrap(), "line1\nline2");
        assert_eq!(unescape("'it\\'s'").unwrap(), "it's");
    }

    #[test]
    fn unescape_rejects_unterminated_literals() {
        assert!(unescape("'oops").is_err());
    }

    #[test]
    fn numbers_narrow_to_int_when_exact() {
        assert_eq!(parse_number("42").unwrap(), NumberLit::Int(42));
        assert_eq!(parse_number("-7").unwrap(), NumberLit::Int(-7));
        assert_eq!(parse_number("21.5").unwrap(), NumberLit::Float(21.5));
    }
}
