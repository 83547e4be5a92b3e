//! Formula tokenizer.
//!
//! A single forward scan over the formula text. Identifiers are maximal
//! letter-led runs of letters/digits/underscore; whether one is a slot
//! reference is decided later (the lexer has no slot knowledge). Errors
//! carry the byte offset of the offending character.

use super::EngineError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Bang,
    LParen,
    RParen,
}

/// Tokenize formula text. Whitespace is skipped; positions are byte offsets.
pub fn tokenize(text: &str) -> Result<Vec<(Token, usize)>, EngineError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => {
                i += 1;
            }
            b'(' => {
                tokens.push((Token::LParen, start));
                i += 1;
            }
            b')' => {
                tokens.push((Token::RParen, start));
                i += 1;
            }
            b'+' => {
                tokens.push((Token::Plus, start));
                i += 1;
            }
            b'-' => {
                tokens.push((Token::Minus, start));
                i += 1;
            }
            b'*' => {
                tokens.push((Token::Star, start));
                i += 1;
            }
            b'/' => {
                tokens.push((Token::Slash, start));
                i += 1;
            }
            b'%' => {
                tokens.push((Token::Percent, start));
                i += 1;
            }
            b'=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((Token::EqEq, start));
                    i += 2;
                } else {
                    return Err(EngineError::syntax(start, "expected `==`"));
                }
            }
            b'!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((Token::NotEq, start));
                    i += 2;
                } else {
                    tokens.push((Token::Bang, start));
                    i += 1;
                }
            }
            b'<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((Token::LtEq, start));
                    i += 2;
                } else {
                    tokens.push((Token::Lt, start));
                    i += 1;
                }
            }
            b'>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((Token::GtEq, start));
                    i += 2;
                } else {
                    tokens.push((Token::Gt, start));
                    i += 1;
                }
            }
            b'&' => {
                if bytes.get(i + 1) == Some(&b'&') {
                    tokens.push((Token::AndAnd, start));
                    i += 2;
                } else {
                    return Err(EngineError::syntax(start, "expected `&&`"));
                }
            }
            b'|' => {
                if bytes.get(i + 1) == Some(&b'|') {
                    tokens.push((Token::OrOr, start));
                    i += 2;
                } else {
                    return Err(EngineError::syntax(start, "expected `||`"));
                }
            }
            b'"' => {
                let (token, next) = scan_string(text, start)?;
                tokens.push((token, start));
                i = next;
            }
            b'0'..=b'9' => {
                let (token, next) = scan_number(text, start)?;
                tokens.push((token, start));
                i = next;
            }
            b'A'..=b'Z' | b'a'..=b'z' => {
                let mut end = i + 1;
                while end < bytes.len()
                    && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                let ident = &text[start..end];
                let token = match ident {
                    "true" => Token::Boolean(true),
                    "false" => Token::Boolean(false),
                    _ => Token::Ident(ident.to_string()),
                };
                tokens.push((token, start));
                i = end;
            }
            _ => {
                // Slice on the char boundary; the byte may lead a
                // multi-byte sequence.
                let ch = text[start..].chars().next().unwrap_or('?');
                return Err(EngineError::syntax(
                    start,
                    format!("unexpected character `{}`", ch),
                ));
            }
        }
    }

    Ok(tokens)
}

fn scan_number(text: &str, start: usize) -> Result<(Token, usize), EngineError> {
    let bytes = text.as_bytes();
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut is_float = false;
    if end < bytes.len() && bytes[end] == b'.' {
        if !bytes.get(end + 1).is_some_and(u8::is_ascii_digit) {
            return Err(EngineError::syntax(end, "expected digits after `.`"));
        }
        is_float = true;
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }

    let literal = &text[start..end];
    let token = if is_float {
        let n = literal
            .parse::<f64>()
            .map_err(|_| EngineError::syntax(start, format!("invalid number `{}`", literal)))?;
        Token::Float(n)
    } else {
        let n = literal
            .parse::<i64>()
            .map_err(|_| EngineError::syntax(start, format!("integer literal out of range `{}`", literal)))?;
        Token::Integer(n)
    };
    Ok((token, end))
}

fn scan_string(text: &str, start: usize) -> Result<(Token, usize), EngineError> {
    let bytes = text.as_bytes();
    let mut out = String::new();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => return Ok((Token::Text(out), i + 1)),
            b'\\' => {
                let escaped = bytes
                    .get(i + 1)
                    .ok_or_else(|| EngineError::syntax(i, "unterminated escape"))?;
                match escaped {
                    b'"' => out.push('"'),
                    b'\\' => out.push('\\'),
                    b'n' => out.push('\n'),
                    b't' => out.push('\t'),
                    _ => return Err(EngineError::syntax(i, "unknown escape")),
                }
                i += 2;
            }
            _ => {
                // Multi-byte UTF-8 is copied through untouched.
                let ch_len = text[i..].chars().next().map_or(1, char::len_utf8);
                out.push_str(&text[i..i + ch_len]);
                i += ch_len;
            }
        }
    }
    Err(EngineError::syntax(start, "unterminated string literal"))
}

#[cfg(test)]
mod tests {
    use super::{Token, tokenize};

    fn kinds(text: &str) -> Vec<Token> {
        tokenize(text).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_tokenize_arithmetic() {
        assert_eq!(
            kinds("C0 + 2 * 3.5"),
            vec![
                Token::Ident("C0".into()),
                Token::Plus,
                Token::Integer(2),
                Token::Star,
                Token::Float(3.5),
            ]
        );
    }

    #[test]
    fn test_tokenize_comparison_and_logic() {
        assert_eq!(
            kinds("V1 >= 2 && !false"),
            vec![
                Token::Ident("V1".into()),
                Token::GtEq,
                Token::Integer(2),
                Token::AndAnd,
                Token::Bang,
                Token::Boolean(false),
            ]
        );
    }

    #[test]
    fn test_tokenize_string_escapes() {
        assert_eq!(kinds(r#""a\"b""#), vec![Token::Text("a\"b".into())]);
    }

    #[test]
    fn test_tokenize_errors_carry_position() {
        let err = tokenize("1 + $").unwrap_err();
        match err {
            super::EngineError::Syntax { pos, .. } => assert_eq!(pos, 4),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_tokenize_rejects_single_equals() {
        assert!(tokenize("C0 = 1").is_err());
    }

    #[test]
    fn test_tokenize_rejects_trailing_dot() {
        assert!(tokenize("1.").is_err());
    }
}
