//! Pane geometry. Every rectangle is derived from the terminal size with
//! saturating arithmetic, so a tiny terminal yields empty panes rather than
//! negative extents.

use ratatui::layout::Rect;

/// Rows used by one post in the list pane: title line and meta line.
pub const POST_ROW_HEIGHT: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panes {
    List,
    ListDetail,
    ListDetailComments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneLayout {
    pub header: Rect,
    pub info: Rect,
    pub list: Rect,
    pub detail: Option<Rect>,
    pub comments: Option<Rect>,
    pub footer: Rect,
}

/// `list_cap` is the most posts the list may show while a detail view is
/// open.
pub fn compute(panes: Panes, width: u16, height: u16, list_cap: u16) -> PaneLayout {
    let header_h = height.min(1);
    let info_h = height.saturating_sub(header_h).min(1);
    let footer_h = height.saturating_sub(header_h + info_h).min(1);
    let body_h = height - header_h - info_h - footer_h;
    let body_y = header_h + info_h;

    let header = Rect::new(0, 0, width, header_h);
    let info = Rect::new(0, header_h, width, info_h);
    let footer = Rect::new(0, body_y + body_h, width, footer_h);
    let cap_rows = list_cap.saturating_mul(POST_ROW_HEIGHT);

    let (list_h, detail_h, comments_h) = match panes {
        Panes::List => (body_h, 0, 0),
        Panes::ListDetail => {
            let list_h = (body_h / 2).min(cap_rows);
            (list_h, body_h - list_h, 0)
        }
        Panes::ListDetailComments => {
            let list_h = (body_h / 3).min(cap_rows);
            let rest = body_h - list_h;
            let detail_h = (u32::from(rest) * 2 / 5) as u16;
            (list_h, detail_h, rest - detail_h)
        }
    };

    let list = Rect::new(0, body_y, width, list_h);
    let detail = (panes != Panes::List).then(|| Rect::new(0, body_y + list_h, width, detail_h));
    let comments = (panes == Panes::ListDetailComments)
        .then(|| Rect::new(0, body_y + list_h + detail_h, width, comments_h));

    PaneLayout {
        header,
        info,
        list,
        detail,
        comments,
        footer,
    }
}

/// Area inside a bordered content pane: below the top border, with one
/// column of padding on each side.
pub fn text_area(pane: Rect) -> Rect {
    if pane.width < 2 || pane.height < 1 {
        return Rect::new(pane.x, pane.y, 0, 0);
    }
    Rect::new(pane.x + 1, pane.y + 1, pane.width - 2, pane.height - 1)
}

pub fn visible_posts(list: Rect) -> usize {
    usize::from(list.height / POST_ROW_HEIGHT)
}

/// First post index to draw so that `selected` stays on screen.
pub fn list_start(selected: usize, visible: usize) -> usize {
    if visible == 0 {
        return selected;
    }
    (selected + 1).saturating_sub(visible)
}
