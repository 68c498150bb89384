//! Fixed-size chunking over a buffer.

use std::ops::Range;

/// One chunk of a buffer: where it starts and how long it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    /// Byte offset of the chunk within the buffer.
    pub offset: u64,
    /// Chunk length in bytes.
    pub len: usize,
}

impl ChunkSpan {
    /// Index range of the chunk within the buffer.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        // Offsets come from a usize-sized buffer, so they fit.
        #[allow(clippy::cast_possible_truncation)]
        let start = self.offset as usize;
        start..start + self.len
    }

    /// Offset just past the chunk.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.offset + self.len as u64
    }
}

/// Cursor that walks a buffer of `total_len` bytes in `chunk_size` steps.
///
/// Yields spans in strictly increasing offset order. The last span holds the
/// remainder and is shorter when `total_len` is not a multiple of
/// `chunk_size`. An empty buffer yields nothing.
#[derive(Debug, Clone)]
pub struct ChunkCursor {
    offset: usize,
    total_len: usize,
    chunk_size: usize,
}

impl ChunkCursor {
    /// Create a cursor at offset 0. A zero `chunk_size` is treated as 1.
    #[must_use]
    pub fn new(total_len: usize, chunk_size: usize) -> Self {
        Self {
            offset: 0,
            total_len,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Current offset.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes not yet handed out.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.total_len - self.offset
    }

    /// Whether every byte has been handed out.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.offset >= self.total_len
    }

    /// Number of chunks the whole buffer splits into.
    #[must_use]
    pub const fn chunk_count(&self) -> usize {
        self.total_len.div_ceil(self.chunk_size)
    }
}

impl Iterator for ChunkCursor {
    type Item = ChunkSpan;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_done() {
            return None;
        }
        let len = self.chunk_size.min(self.remaining());
        let span = ChunkSpan {
            offset: self.offset as u64,
            len,
        };
        self.offset += len;
        Some(span)
    }
}
