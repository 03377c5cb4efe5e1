//! Line extraction
//!
//! Splits a fetched buffer into complete, newline-terminated lines. The
//! buffer must start exactly at the current offset. Bytes after the last
//! newline are left unconsumed: they are not emitted and not counted into
//! the returned offset, so the next poll fetches them again together with
//! whatever completes the line.

use crate::types::Offset;

/// Lines found in a buffer and the offset just past the last of them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    /// Complete lines in file order, without their trailing newline
    pub lines: Vec<String>,
    /// Offset immediately after the last consumed newline
    pub new_offset: Offset,
}

impl Extracted {
    /// Number of bytes consumed relative to the start offset
    pub fn consumed(&self, start_offset: Offset) -> u64 {
        self.new_offset - start_offset
    }
}

/// Split `buffer` into complete lines starting at `start_offset`
pub fn extract_lines(buffer: &[u8], start_offset: Offset) -> Extracted {
    let mut lines = Vec::new();
    let mut new_offset = start_offset;
    let mut rest = buffer;

    while let Some(nl) = rest.iter().position(|&b| b == b'\n') {
        lines.push(String::from_utf8_lossy(&rest[..nl]).into_owned());
        new_offset += nl as u64 + 1;
        rest = &rest[nl + 1..];
    }

    Extracted { lines, new_offset }
}
