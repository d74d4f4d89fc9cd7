//! Tokenizer for expression text.

use crate::{CalcError, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tok {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    /// Either `**` or `^`
    Pow,
    LParen,
    RParen,
}

/// A token together with the byte offset where it starts in the source text
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub tok: Tok,
    pub pos: usize,
}

pub(crate) fn tokenize(text: &str) -> Result<Vec<Token>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            i = scan_number(bytes, i);
            let literal = &text[start..i];
            let value = literal
                .parse::<f64>()
                .map_err(|_| CalcError::parse(start, format!("invalid number '{literal}'")))?;
            tokens.push(Token {
                tok: Tok::Num(value),
                pos: start,
            });
            continue;
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push(Token {
                tok: Tok::Ident(text[start..i].to_string()),
                pos: start,
            });
            continue;
        }

        let tok = match c {
            b'+' => Tok::Plus,
            b'-' => Tok::Minus,
            b'*' if bytes.get(i + 1) == Some(&b'*') => {
                i += 1;
                Tok::Pow
            }
            b'*' => Tok::Star,
            b'/' => Tok::Slash,
            b'^' => Tok::Pow,
            b'(' => Tok::LParen,
            b')' => Tok::RParen,
            _ => {
                // Report the whole character, not just its first byte
                let ch = text[start..].chars().next().unwrap_or('?');
                return Err(CalcError::parse(start, format!("unexpected character '{ch}'")));
            }
        };
        i += 1;
        tokens.push(Token { tok, pos: start });
    }

    Ok(tokens)
}

/// Advances over a numeric literal: digits, an optional fraction, and an optional exponent. An
/// `e` is only consumed as an exponent when digits follow it.
fn scan_number(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    i
}
