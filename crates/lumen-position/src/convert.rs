//! UTF-8 ↔ UTF-16 column conversion against tokenized lines.
//!
//! The compiler reports columns as UTF-8 byte offsets while the wire carries
//! UTF-16 code units. The gap between two tokens is always single-byte
//! characters (whitespace and punctuation survive tokenization unchanged), so
//! the token texts on a line are the only places where the two units diverge.

use crate::Position;

/// The view of a lexed token the converters need.
///
/// Implemented by the syntax crate's token type; kept as a trait so this
/// crate stays a leaf.
pub trait SourceToken {
    /// The token text exactly as written.
    fn text(&self) -> &str;
    /// Start position with a UTF-8 byte column.
    fn begin(&self) -> Position;
}

/// Number of Unicode scalar values in `s`.
///
/// Used to widen a token range by its on-screen length when a symbol has no
/// usable declaration range of its own.
pub fn count_unicode_chars(s: &str) -> i32 {
    s.chars().count() as i32
}

fn utf16_len(s: &str) -> i32 {
    s.encode_utf16().count() as i32
}

/// Converts `pos` from a UTF-16 code-unit column to a UTF-8 byte column.
///
/// Absent positions pass through unchanged. Tokens on other lines are
/// ignored; tokens are assumed ordered by start position, as the lexer emits
/// them.
pub fn utf16_to_utf8<T: SourceToken>(tokens: &[T], pos: Position) -> Position {
    if pos.is_absent() {
        return pos;
    }
    // Accumulated utf8-minus-utf16 difference of the tokens left of `pos`.
    let mut delta = 0i32;
    for tok in tokens {
        let begin = tok.begin();
        if begin.line != pos.line {
            continue;
        }
        let text = tok.text();
        let u16_start = begin.column - delta;
        if pos.column <= u16_start {
            break;
        }
        let u16_len = utf16_len(text);
        if pos.column < u16_start + u16_len {
            // Inside the token: walk its chars until the prefix is consumed.
            let want = pos.column - u16_start;
            let mut u16_seen = 0i32;
            let mut u8_seen = 0i32;
            for ch in text.chars() {
                if u16_seen >= want {
                    break;
                }
                u16_seen += ch.len_utf16() as i32;
                u8_seen += ch.len_utf8() as i32;
            }
            return Position { column: begin.column + u8_seen, ..pos };
        }
        delta += text.len() as i32 - u16_len;
    }
    Position { column: pos.column + delta, ..pos }
}

/// Converts `pos` from a UTF-8 byte column to a UTF-16 code-unit column.
///
/// Inverse of [`utf16_to_utf8`] for any column that falls on a character
/// boundary of the line.
pub fn utf8_to_utf16<T: SourceToken>(tokens: &[T], pos: Position) -> Position {
    if pos.is_absent() {
        return pos;
    }
    let mut delta = 0i32;
    for tok in tokens {
        let begin = tok.begin();
        if begin.line != pos.line {
            continue;
        }
        let text = tok.text();
        if pos.column <= begin.column {
            break;
        }
        let u8_len = text.len() as i32;
        if pos.column < begin.column + u8_len {
            let want = pos.column - begin.column;
            let mut u8_seen = 0i32;
            let mut u16_seen = 0i32;
            for ch in text.chars() {
                if u8_seen >= want {
                    break;
                }
                u8_seen += ch.len_utf8() as i32;
                u16_seen += ch.len_utf16() as i32;
            }
            return Position { column: begin.column - delta + u16_seen, ..pos };
        }
        delta += u8_len - utf16_len(text);
    }
    Position { column: pos.column - delta, ..pos }
}
