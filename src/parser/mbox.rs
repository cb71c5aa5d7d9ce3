//! Mbox archive splitting.
//!
//! Partitions archive content into candidate message blocks on `From `
//! delimiter lines. Tolerant of malformed input: an archive without a
//! single delimiter is one big block, never an error.

use std::path::Path;

use crate::error::{Result, SiftError};

/// One candidate message: a contiguous slice of the archive, including its
/// leading delimiter line (stripped later by the assembler).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageBlock<'a> {
    /// Position in split order (0-based). Downstream numbering is defined
    /// over this order, not over completion or date order.
    pub index: u64,
    /// Raw content, delimiter line included.
    pub raw: &'a str,
}

/// Splits archive content into [`MessageBlock`]s.
///
/// Split points are lines beginning exactly with `From ` at stream start or
/// immediately after a newline. Body lines that happen to start with
/// `From ` are NOT escaped and cause a false split; plain mbox carries no
/// `>From ` quoting.
#[derive(Debug, Clone, Copy)]
pub struct MessageSplitter<'a> {
    content: &'a str,
}

impl<'a> MessageSplitter<'a> {
    /// Create a splitter over the full archive content.
    pub fn new(content: &'a str) -> Self {
        Self { content }
    }

    /// Lazy iterator over blocks. Calling this again restarts the sequence
    /// from the beginning.
    ///
    /// Content before the first delimiter (or a delimiter-free archive) is
    /// yielded as a block of its own, so concatenating all blocks in order
    /// reproduces the input exactly. Empty input yields nothing.
    pub fn blocks(&self) -> Blocks<'a> {
        Blocks {
            content: self.content,
            pos: 0,
            index: 0,
        }
    }

    /// Number of blocks the archive splits into.
    pub fn count(&self) -> u64 {
        self.blocks().count() as u64
    }
}

/// Iterator over the blocks of one archive.
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    content: &'a str,
    pos: usize,
    index: u64,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = MessageBlock<'a>;

    fn next(&mut self) -> Option<MessageBlock<'a>> {
        if self.pos >= self.content.len() {
            return None;
        }
        let start = self.pos;
        let end = next_delimiter(self.content, start).unwrap_or(self.content.len());
        self.pos = end;
        let block = MessageBlock {
            index: self.index,
            raw: &self.content[start..end],
        };
        self.index += 1;
        Some(block)
    }
}

/// Find the start of the first delimiter line strictly after `from`.
///
/// A delimiter at `from` itself belongs to the current block, so the scan
/// looks for `\nFrom ` and returns the position just past the newline.
fn next_delimiter(content: &str, from: usize) -> Option<usize> {
    content[from..].find("\nFrom ").map(|i| from + i + 1)
}

/// Read an archive into memory, decoding UTF-8 with a WINDOWS-1252
/// fallback (which accepts every byte) and stripping a leading BOM.
pub fn read_archive(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SiftError::FileNotFound(path.to_path_buf())
        } else {
            SiftError::io(path, e)
        }
    })?;

    let bytes = data
        .strip_prefix([0xEF, 0xBB, 0xBF].as_slice())
        .unwrap_or(&data);

    Ok(match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
    })
}
