use std::ops::Range;

/// Windowing over a memory-cell sequence. Only the cells inside
/// [`visible_range`](MemoryViewport::visible_range) are ever materialized.
///
/// Geometry is in host units: a terminal uses rows (row height 1), a pixel
/// surface would use pixels. Scrolling never touches emulator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryViewport {
    row_height: u32,
    extent: u32,
    offset: u32,
    len: usize,
}

impl MemoryViewport {
    pub fn new(row_height: u32, extent: u32) -> Self {
        Self {
            row_height: row_height.max(1),
            extent,
            offset: 0,
            len: 0,
        }
    }

    pub fn row_height(&self) -> u32 {
        self.row_height
    }

    pub fn extent(&self) -> u32 {
        self.extent
    }

    pub fn scroll_offset(&self) -> u32 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Rows that fit in the extent, counting a partially shown last row.
    pub fn visible_count(&self) -> usize {
        self.extent.div_ceil(self.row_height) as usize
    }

    fn max_offset(&self) -> u32 {
        let content = (self.len as u64 * self.row_height as u64).min(u32::MAX as u64) as u32;
        content.saturating_sub(self.extent)
    }

    fn clamp(&mut self) {
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn visible_range(&self) -> Range<usize> {
        let start = ((self.offset / self.row_height) as usize).min(self.len);
        let end = (start + self.visible_count()).min(self.len);
        start..end
    }

    /// The slice of `cells` inside the visible range.
    pub fn visible<'a, T>(&self, cells: &'a [T]) -> &'a [T] {
        let range = self.visible_range();
        let end = range.end.min(cells.len());
        &cells[range.start.min(end)..end]
    }

    /// Number of cells in the sequence being windowed. Shrinking clamps the
    /// scroll offset so the window stays inside the sequence.
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        self.clamp();
    }

    pub fn resize(&mut self, extent: u32) {
        self.extent = extent;
        self.clamp();
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }

    pub fn scroll_to(&mut self, offset: u32) {
        self.offset = offset;
        self.clamp();
    }

    pub fn scroll_by(&mut self, delta: i64) {
        let target = (self.offset as i64 + delta).clamp(0, u32::MAX as i64);
        self.scroll_to(target as u32);
    }

    /// Scroll by whole rows.
    pub fn scroll_rows(&mut self, rows: i64) {
        self.scroll_by(rows * self.row_height as i64);
    }

    /// Scroll just enough to bring cell `index` into view.
    pub fn scroll_to_index(&mut self, index: usize) {
        if index >= self.len {
            return;
        }
        let range = self.visible_range();
        let top = index as u64 * self.row_height as u64;
        if index < range.start {
            self.scroll_to(top as u32);
        } else if index >= range.end || top + self.row_height as u64 > (self.offset + self.extent) as u64 {
            let bottom = top + self.row_height as u64;
            self.scroll_to(bottom.saturating_sub(self.extent as u64) as u32);
        }
    }
}
