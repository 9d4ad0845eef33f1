use std::borrow::Cow;

use super::java::{check_tree, create_parser};
use super::{Grammar, ParseFailure, ParsedUnit, PredictionMode};

/// Pre-Java-5 dialect, where `enum` is an ordinary identifier.
///
/// Identifier occurrences of `enum` are rewritten to the same-length `enu$`
/// before parsing, which keeps every byte offset of the tree valid for the
/// original text. There is only one attempt: the prediction mode is ignored.
#[derive(Debug, Default)]
pub struct LegacyJava;

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_ident_part(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

/// Index just past the end of a quoted literal starting at `start`.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_text_block(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 3;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
        } else if bytes[i..].starts_with(b"\"\"\"") {
            return i + 3;
        } else {
            i += 1;
        }
    }
    bytes.len()
}

/// Replaces identifier uses of `enum` outside comments and literals.
pub fn mask_enum_identifiers(source: &str) -> Cow<'_, str> {
    if !source.contains("enum") {
        return Cow::Borrowed(source);
    }

    let bytes = source.as_bytes();
    let mut masked = bytes.to_vec();
    let mut changed = false;
    let mut i = 0;
    while i < bytes.len() {
        let rest = &bytes[i..];
        if rest.starts_with(b"//") {
            i = rest
                .iter()
                .position(|&b| b == b'\n')
                .map_or(bytes.len(), |p| i + p);
        } else if rest.starts_with(b"/*") {
            i = rest[2..]
                .windows(2)
                .position(|w| w == b"*/")
                .map_or(bytes.len(), |p| i + 2 + p + 2);
        } else if rest.starts_with(b"\"\"\"") {
            i = skip_text_block(bytes, i);
        } else if bytes[i] == b'"' || bytes[i] == b'\'' {
            i = skip_quoted(bytes, i, bytes[i]);
        } else if is_ident_part(bytes[i]) {
            let start = i;
            while i < bytes.len() && is_ident_part(bytes[i]) {
                i += 1;
            }
            if &bytes[start..i] == b"enum" && is_ident_start(bytes[start]) {
                masked[start + 3] = b'$';
                changed = true;
            }
        } else {
            i += 1;
        }
    }

    if !changed {
        return Cow::Borrowed(source);
    }
    match String::from_utf8(masked) {
        Ok(text) => Cow::Owned(text),
        Err(_) => Cow::Borrowed(source),
    }
}

impl Grammar for LegacyJava {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn parse(&self, source: &str, _mode: PredictionMode) -> Result<ParsedUnit, ParseFailure> {
        let masked = mask_enum_identifiers(source);
        let mut parser = create_parser()?;
        let tree = parser
            .parse(masked.as_ref(), None)
            .ok_or_else(|| ParseFailure::Fault("tree-sitter parse returned None".into()))?;
        check_tree(tree, &masked, self.name())
    }
}
