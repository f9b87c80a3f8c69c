//! Text model primitives: sizes, ranges, and line/column conversions.

pub use text_size::{TextRange, TextSize};

/// Clamp a `usize` byte offset into a [`TextSize`].
pub fn text_size(offset: usize) -> TextSize {
    TextSize::from(u32::try_from(offset).unwrap_or(u32::MAX))
}

pub fn text_range(start: usize, end: usize) -> TextRange {
    TextRange::new(text_size(start), text_size(end))
}

/// Zero-based line and UTF-8 byte column.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// Pre-computed line start offsets for a particular text snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineIndex {
    line_starts: Vec<TextSize>,
    line_ends: Vec<TextSize>,
    text_len: TextSize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut line_starts = vec![TextSize::from(0)];
        let mut line_ends = Vec::new();

        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    line_ends.push(text_size(i));
                    line_starts.push(text_size(i + 1));
                    i += 1;
                }
                b'\r' => {
                    line_ends.push(text_size(i));
                    let step = if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                    line_starts.push(text_size(i + step));
                    i += step;
                }
                _ => i += 1,
            }
        }

        line_ends.push(text_size(text.len()));

        Self {
            line_starts,
            line_ends,
            text_len: text_size(text.len()),
        }
    }

    #[inline]
    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    fn line_index(&self, offset: TextSize) -> usize {
        let offset = offset.min(self.text_len);
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(insert) => insert.saturating_sub(1),
        }
    }

    /// Convert a byte offset to a line/column pair.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(self.text_len);
        let line = self.line_index(offset);
        let col = offset.min(self.line_ends[line]) - self.line_starts[line];
        LineCol {
            line: line as u32,
            col: u32::from(col),
        }
    }

    /// Convert a line/column pair to a byte offset, or `None` when it points
    /// past the end of its line.
    pub fn offset(&self, line_col: LineCol) -> Option<TextSize> {
        let start = *self.line_starts.get(line_col.line as usize)?;
        let end = *self.line_ends.get(line_col.line as usize)?;
        let offset = start + TextSize::from(line_col.col);
        (offset <= end).then_some(offset)
    }
}
