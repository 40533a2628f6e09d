//! Scroll bounds for the detail and comment panes.
//!
//! The maximum offset is always derived from the current content length and
//! viewport; nothing stores it. Key handling and drawing both call into
//! this module so the two can never disagree.

use std::ops::Range;

/// Rows at the top of the detail pane that never scroll: title, meta, blank.
pub const DETAIL_HEADER_ROWS: usize = 3;
/// Rows at the top of the comment pane that never scroll: status, blank.
pub const COMMENTS_HEADER_ROWS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scroll {
    LineUp,
    LineDown,
    PageUp,
    PageDown,
    Home,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    pub max_offset: usize,
    pub visible: Range<usize>,
}

/// Number of content rows left in a pane of `viewport` rows after its fixed
/// header rows.
pub fn content_rows(viewport: usize, margin: usize) -> usize {
    viewport.saturating_sub(margin)
}

/// `max(0, total - viewport + margin)`, with the viewport floored at the
/// margin so a pane too short for any content still yields an offset within
/// the content.
pub fn max_offset(total: usize, viewport: usize, margin: usize) -> usize {
    total.saturating_sub(content_rows(viewport, margin))
}

pub fn window(total: usize, viewport: usize, margin: usize, offset: usize) -> Window {
    let max_offset = max_offset(total, viewport, margin);
    let offset = offset.min(max_offset);
    let start = offset.min(total);
    let end = offset
        .saturating_add(content_rows(viewport, margin))
        .min(total)
        .max(start);
    Window {
        offset,
        max_offset,
        visible: start..end,
    }
}

pub fn apply(offset: usize, scroll: Scroll, page: usize, max_offset: usize) -> usize {
    let next = match scroll {
        Scroll::LineUp => offset.saturating_sub(1),
        Scroll::LineDown => offset.saturating_add(1),
        Scroll::PageUp => offset.saturating_sub(page),
        Scroll::PageDown => offset.saturating_add(page),
        Scroll::Home => 0,
        Scroll::End => max_offset,
    };
    next.min(max_offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn max_offset_matches_formula() {
        assert_eq!(max_offset(50, 20, 3), 33);
        assert_eq!(max_offset(10, 20, 3), 0);
        assert_eq!(max_offset(0, 0, 3), 0);
    }

    #[test]
    fn short_viewport_keeps_offset_inside_content() {
        assert_eq!(max_offset(10, 2, 3), 10);
        let win = window(10, 2, 3, 50);
        assert_eq!(win.offset, 10);
        assert_eq!(win.visible, 10..10);
    }

    #[test]
    fn window_slices_visible_rows() {
        let win = window(50, 20, 3, 5);
        assert_eq!(win.visible, 5..22);
        let win = window(50, 20, 3, 33);
        assert_eq!(win.visible, 33..50);
    }

    #[test]
    fn end_then_down_is_noop() {
        let max = max_offset(50, 20, 3);
        let at_end = apply(0, Scroll::End, 10, max);
        assert_eq!(at_end, 33);
        assert_eq!(apply(at_end, Scroll::LineDown, 10, max), 33);
    }

    #[test]
    fn page_moves_clamp_at_edges() {
        assert_eq!(apply(3, Scroll::PageUp, 10, 40), 0);
        assert_eq!(apply(35, Scroll::PageDown, 10, 40), 40);
        assert_eq!(apply(0, Scroll::LineUp, 10, 40), 0);
        assert_eq!(apply(12, Scroll::Home, 10, 40), 0);
    }

    proptest! {
        #[test]
        fn offsets_stay_in_bounds(total in 0usize..500, viewport in 0usize..120, margin in 0usize..6, offset in 0usize..1000) {
            let win = window(total, viewport, margin, offset);
            prop_assert!(win.offset <= win.max_offset);
            prop_assert!(win.visible.start <= win.visible.end);
            prop_assert!(win.visible.end <= total);
        }

        #[test]
        fn applied_scroll_stays_in_bounds(offset in 0usize..1000, page in 0usize..20, max in 0usize..500, step in 0usize..6) {
            let scroll = [Scroll::LineUp, Scroll::LineDown, Scroll::PageUp, Scroll::PageDown, Scroll::Home, Scroll::End][step];
            prop_assert!(apply(offset, scroll, page, max) <= max);
        }
    }
}
