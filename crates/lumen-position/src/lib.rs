//! Source positions and ranges for Lumen tooling.
//!
//! Columns come in two encodings: the compiler's native UTF-8 byte offsets
//! and the editor protocol's UTF-16 code units. Conversion between the two is
//! performed against the tokenized line (see [`convert`]), never the raw
//! source string, because the lexer may merge or split byte sequences a raw
//! count would mis-attribute.

mod convert;
mod position;

pub use convert::{count_unicode_chars, utf8_to_utf16, utf16_to_utf8, SourceToken};
pub use position::{Position, Range};
