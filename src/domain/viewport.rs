//! Scroll position of the grid, kept stable across structural updates.

/// First visible row plus the pixel offset into it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowIndexAnchor {
    pub index: usize,
    pub pixel_offset: i32,
}

impl RowIndexAnchor {
    pub fn new(index: usize, pixel_offset: i32) -> Self {
        Self {
            index,
            pixel_offset,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewportState {
    pub row_anchor: RowIndexAnchor,
}

impl ViewportState {
    pub fn anchored_at(index: usize) -> Self {
        Self {
            row_anchor: RowIndexAnchor::new(index, 0),
        }
    }
}
