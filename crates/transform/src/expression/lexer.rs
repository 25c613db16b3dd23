//! Expression tokenizer

use super::EvaluationError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    /// `$(name)`
    Meter(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Power,
    LParen,
    RParen,
    Comma,
}

/// A token with its byte offset in the source
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, EvaluationError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        let token = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' if bytes.get(i + 1) == Some(&b'*') => {
                i += 1;
                Token::Power
            }
            b'*' => Token::Star,
            b'/' => Token::Slash,
            b'%' => Token::Percent,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b',' => Token::Comma,
            b'$' => {
                if bytes.get(i + 1) != Some(&b'(') {
                    return Err(EvaluationError::parse(i, "expected '(' after '$'"));
                }
                let name_start = i + 2;
                let Some(len) = source[name_start..].find(')') else {
                    return Err(EvaluationError::parse(i, "unterminated meter reference"));
                };
                let name = source[name_start..name_start + len].trim();
                if name.is_empty() {
                    return Err(EvaluationError::parse(i, "empty meter reference"));
                }
                i = name_start + len;
                Token::Meter(name.to_string())
            }
            b'0'..=b'9' | b'.' => {
                let end = scan_number(bytes, i);
                let text = &source[i..end];
                let value = text
                    .parse::<f64>()
                    .map_err(|_| EvaluationError::parse(i, format!("invalid number '{text}'")))?;
                i = end;
                tokens.push(Spanned {
                    token: Token::Number(value),
                    position: start,
                });
                continue;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let mut end = i;
                while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
                    end += 1;
                }
                let ident = source[i..end].to_string();
                i = end;
                tokens.push(Spanned {
                    token: Token::Ident(ident),
                    position: start,
                });
                continue;
            }
            other => {
                return Err(EvaluationError::parse(
                    i,
                    format!("unexpected character '{}'", other as char),
                ));
            }
        };

        i += 1;
        tokens.push(Spanned {
            token,
            position: start,
        });
    }

    Ok(tokens)
}

/// End offset of a number literal starting at `start`
fn scan_number(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
        end += 1;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            while exp < bytes.len() && bytes[exp].is_ascii_digit() {
                exp += 1;
            }
            end = exp;
        }
    }
    end
}
