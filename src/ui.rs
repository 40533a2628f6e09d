//! Screen composition. Everything here reads `ViewState` and paints; the
//! only inputs are the state, the frame size and the current time.

use chrono::{DateTime, Utc};
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Padding, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::comments::{CommentLine, LineKind};
use crate::layout::{self, POST_ROW_HEIGHT};
use crate::reddit::Post;
use crate::scroll::{self, COMMENTS_HEADER_ROWS, DETAIL_HEADER_ROWS};
use crate::state::{CommentsStatus, LoadStatus, Mode, ViewState};
use crate::text;

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);
const COMMENT_DEPTH_COLORS: [Color; 6] = [
    Color::Rgb(250, 179, 135),
    Color::Rgb(166, 227, 161),
    Color::Rgb(203, 166, 247),
    Color::Rgb(245, 194, 231),
    Color::Rgb(137, 220, 235),
    Color::Rgb(249, 226, 175),
];

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const ICON_UPVOTES: &str = "⬆";
const ICON_COMMENTS: &str = "💬";

fn comment_depth_color(depth: usize) -> Color {
    COMMENT_DEPTH_COLORS[depth % COMMENT_DEPTH_COLORS.len()]
}

fn spinner_frame(state: &ViewState) -> &'static str {
    SPINNER_FRAMES[state.spinner() % SPINNER_FRAMES.len()]
}

pub fn draw(frame: &mut Frame<'_>, state: &ViewState) {
    draw_at(frame, state, Utc::now());
}

pub fn draw_at(frame: &mut Frame<'_>, state: &ViewState, now: DateTime<Utc>) {
    let full = frame.size();
    frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

    let panes = state.layout_for(full.width, full.height);
    draw_header(frame, state, panes.header);
    draw_info(frame, state, panes.info);

    if state.has_feed() {
        draw_posts(frame, state, panes.list, now);
        if let Some(area) = panes.detail {
            draw_detail(frame, state, area, now);
        }
        if let Some(area) = panes.comments {
            draw_comments(frame, state, area);
        }
    } else {
        draw_status_screen(frame, state, panes.list);
    }

    draw_footer(frame, state, panes.footer);
}

fn draw_header(frame: &mut Frame<'_>, state: &ViewState, area: Rect) {
    let feed = state.feed();
    let mut spans = vec![
        Span::styled(
            " RView ",
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("r/{}", state.displayed_source()),
            Style::default().fg(COLOR_TEXT_PRIMARY),
        ),
    ];
    if state.has_feed() {
        let count = if feed.query().is_empty() {
            format!("  {} posts", feed.filtered_len())
        } else {
            format!("  {}/{} posts", feed.filtered_len(), feed.all_posts().len())
        };
        spans.push(Span::styled(count, Style::default().fg(COLOR_TEXT_SECONDARY)));
    }
    if state.is_loading() {
        spans.push(Span::styled(
            format!("  {}", spinner_frame(state)),
            Style::default().fg(COLOR_ACCENT),
        ));
    }
    let header = Paragraph::new(Line::from(spans)).style(
        Style::default()
            .bg(COLOR_PANEL_FOCUSED_BG)
            .add_modifier(Modifier::BOLD),
    );
    frame.render_widget(header, area);
}

fn draw_info(frame: &mut Frame<'_>, state: &ViewState, area: Rect) {
    let prompt = Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD);
    let plain = Style::default().fg(COLOR_TEXT_SECONDARY);

    let line = match state.mode() {
        Mode::Searching { input, .. } => Line::from(vec![
            Span::styled(" Search: ", prompt),
            Span::styled(format!("{input}_"), Style::default().fg(COLOR_TEXT_PRIMARY)),
        ]),
        Mode::SelectingSource { input, .. } => Line::from(vec![
            Span::styled(" Subreddit: r/", prompt),
            Span::styled(format!("{input}_"), Style::default().fg(COLOR_TEXT_PRIMARY)),
        ]),
        _ => {
            if let Some(notice) = state.notice() {
                Line::from(Span::styled(format!(" {notice}"), Style::default().fg(COLOR_SUCCESS)))
            } else if let LoadStatus::Error(message) = state.load_status() {
                Line::from(Span::styled(
                    format!(" Error: {message} (F5 to retry)"),
                    Style::default().fg(COLOR_ERROR),
                ))
            } else if state.load_status() == &LoadStatus::Loading && state.has_feed() {
                Line::from(Span::styled(
                    format!(" {} Loading r/{}...", spinner_frame(state), state.source()),
                    plain,
                ))
            } else if !state.feed().query().is_empty() {
                Line::from(Span::styled(
                    format!(" Filter: {}", state.feed().query()),
                    plain,
                ))
            } else {
                Line::default()
            }
        }
    };
    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(COLOR_PANEL_BG)),
        area,
    );
}

fn draw_status_screen(frame: &mut Frame<'_>, state: &ViewState, area: Rect) {
    let (lines, color) = match state.load_status() {
        LoadStatus::Error(message) => (
            vec![
                Line::from(format!("Failed to load r/{}", state.source())),
                Line::default(),
                Line::from(message.clone()),
                Line::default(),
                Line::from("Press q to quit or F5 to retry"),
            ],
            COLOR_ERROR,
        ),
        _ => (
            vec![Line::from(format!(
                "{} Loading r/{}...",
                spinner_frame(state),
                state.source()
            ))],
            COLOR_TEXT_PRIMARY,
        ),
    };
    let top_pad = area.height.saturating_sub(lines.len() as u16) / 2;
    let body = Rect::new(
        area.x,
        area.y + top_pad,
        area.width,
        area.height.saturating_sub(top_pad),
    );
    let paragraph = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, body);
}

fn post_meta(post: &Post, now: DateTime<Utc>) -> String {
    let mut meta = format!(
        "u/{} • {ICON_UPVOTES} {} • {ICON_COMMENTS} {}",
        post.author,
        text::format_count(post.score),
        text::format_count(post.num_comments)
    );
    if let Some(created) = post.created_at() {
        meta.push_str(" • ");
        meta.push_str(&text::format_age(created, now));
    }
    meta
}

fn draw_posts(frame: &mut Frame<'_>, state: &ViewState, area: Rect, now: DateTime<Utc>) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let feed = state.feed();
    if feed.is_empty() {
        let message = if feed.query().is_empty() {
            "No posts in this subreddit.".to_string()
        } else {
            format!("No posts match \"{}\".", feed.query())
        };
        frame.render_widget(
            Paragraph::new(message)
                .alignment(Alignment::Center)
                .style(Style::default().fg(COLOR_TEXT_SECONDARY)),
            area,
        );
        return;
    }

    let visible = layout::visible_posts(area).max(1);
    let selected = feed.selected_index();
    let start = layout::list_start(selected, visible);
    let width = usize::from(area.width);
    let title_room = width
        .saturating_sub(8)
        .min(state.settings().max_title_length)
        .max(1);

    let mut lines: Vec<Line> = Vec::with_capacity(visible * usize::from(POST_ROW_HEIGHT));
    for (idx, post) in feed.filtered().enumerate().skip(start).take(visible) {
        let is_selected = idx == selected;
        let background = if is_selected {
            COLOR_PANEL_SELECTED_BG
        } else {
            COLOR_BG
        };
        let marker = if is_selected { "▶" } else { " " };
        let title_style = if is_selected {
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(background)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_TEXT_PRIMARY).bg(background)
        };
        let title = format!(
            "{marker} {:>3}. {}",
            idx + 1,
            text::truncate(&post.title, title_room)
        );
        lines.push(padded(title, width, title_style));
        lines.push(padded(
            format!("       {}", post_meta(post, now)),
            width,
            Style::default().fg(COLOR_TEXT_SECONDARY).bg(background),
        ));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

fn padded(content: String, width: usize, style: Style) -> Line<'static> {
    let fill = width.saturating_sub(content.width());
    Line::from(Span::styled(format!("{content}{}", " ".repeat(fill)), style))
}

fn pane_block(title: &str, focused: bool) -> Block<'static> {
    let border_style = if focused {
        Style::default().fg(COLOR_BORDER_FOCUSED)
    } else {
        Style::default().fg(COLOR_BORDER_IDLE)
    };
    let title_style = if focused {
        Style::default()
            .fg(COLOR_ACCENT)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(COLOR_TEXT_SECONDARY)
    };
    Block::default()
        .title(Span::styled(title.to_string(), title_style))
        .borders(Borders::TOP)
        .border_style(border_style)
        .style(Style::default().bg(COLOR_PANEL_BG))
        .padding(Padding::horizontal(1))
}

fn draw_detail(frame: &mut Frame<'_>, state: &ViewState, area: Rect, now: DateTime<Utc>) {
    let focused = matches!(state.mode(), Mode::ViewingDetail);
    frame.render_widget(pane_block(" Post ", focused), area);
    let inner = layout::text_area(area);
    let Some(post) = state.feed().current_post() else {
        return;
    };
    if inner.height == 0 {
        return;
    }

    let width = usize::from(inner.width);
    let content = state.detail_content(width);
    let win = scroll::window(
        content.len(),
        usize::from(inner.height),
        DETAIL_HEADER_ROWS,
        state.detail_scroll(),
    );

    let mut lines = vec![
        Line::from(Span::styled(
            text::truncate(&post.title, width.min(state.settings().max_title_length)),
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            text::truncate(
                &format!("{} • r/{}", post_meta(post, now), post.subreddit),
                width,
            ),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )),
        Line::default(),
    ];
    lines.extend(
        content[win.visible]
            .iter()
            .map(|line| Line::from(Span::styled(line.clone(), Style::default().fg(COLOR_TEXT_PRIMARY)))),
    );
    frame.render_widget(Paragraph::new(lines), inner);
}

fn comments_status_line(state: &ViewState) -> Line<'static> {
    let secondary = Style::default()
        .fg(COLOR_TEXT_SECONDARY)
        .add_modifier(Modifier::BOLD);
    match &state.comments().status {
        CommentsStatus::NotLoaded => Line::from(Span::styled("Press c to load comments", secondary)),
        CommentsStatus::Loading { .. } => Line::from(Span::styled(
            format!("{} Loading comments...", spinner_frame(state)),
            secondary,
        )),
        CommentsStatus::Failed(message) => Line::from(Span::styled(
            format!("Failed to load comments: {message}"),
            Style::default().fg(COLOR_ERROR),
        )),
        CommentsStatus::Loaded if state.comments().tree.is_empty() => {
            Line::from(Span::styled("No comments yet.", secondary))
        }
        CommentsStatus::Loaded => {
            let total = state
                .feed()
                .current_post()
                .map_or(0, |post| post.num_comments);
            Line::from(Span::styled(
                format!(
                    "{ICON_COMMENTS} {} comments, top {} shown",
                    text::format_count(total),
                    state.comments().tree.roots().len()
                ),
                secondary,
            ))
        }
    }
}

fn comment_line(line: &CommentLine) -> Line<'static> {
    let style = match line.kind {
        LineKind::Header => Style::default()
            .fg(comment_depth_color(line.depth))
            .add_modifier(Modifier::BOLD),
        LineKind::Body => Style::default().fg(COLOR_TEXT_PRIMARY),
        LineKind::Separator => Style::default(),
    };
    Line::from(Span::styled(line.text.clone(), style))
}

fn draw_comments(frame: &mut Frame<'_>, state: &ViewState, area: Rect) {
    let focused = matches!(state.mode(), Mode::ViewingComments);
    frame.render_widget(pane_block(" Comments ", focused), area);
    let inner = layout::text_area(area);
    if inner.height == 0 {
        return;
    }

    let content = state.comment_lines(usize::from(inner.width));
    let win = scroll::window(
        content.len(),
        usize::from(inner.height),
        COMMENTS_HEADER_ROWS,
        state.comments().scroll,
    );
    let mut lines = vec![comments_status_line(state), Line::default()];
    lines.extend(content[win.visible].iter().map(comment_line));
    frame.render_widget(Paragraph::new(lines), inner);
}

fn footer_hints(mode: &Mode) -> &'static str {
    match mode {
        Mode::Browsing => {
            "↑↓/jk move • Enter open • Ctrl+F search • Ctrl+R subreddit • F5 refresh • w browser • q quit"
        }
        Mode::ViewingDetail => {
            "↑↓ scroll • PgUp/PgDn page • ←→ post • c comments • w browser • Esc back"
        }
        Mode::ViewingComments => "↑↓ scroll • PgUp/PgDn page • z fold • ←→ post • c/Esc back",
        Mode::Searching { .. } => "Type to filter • Enter confirm • Esc cancel",
        Mode::SelectingSource { .. } => "Type a subreddit • Enter load • Esc cancel",
    }
}

fn draw_footer(frame: &mut Frame<'_>, state: &ViewState, area: Rect) {
    let feed = state.feed();
    let position = if !state.has_feed() {
        String::new()
    } else if feed.is_empty() {
        "No posts │ ".to_string()
    } else {
        format!("Post {}/{} │ ", feed.selected_index() + 1, feed.filtered_len())
    };
    let footer = Paragraph::new(format!("{position}{}", footer_hints(state.mode())))
        .style(
            Style::default()
                .fg(COLOR_TEXT_SECONDARY)
                .bg(COLOR_PANEL_BG)
                .add_modifier(Modifier::ITALIC),
        )
        .alignment(Alignment::Center);
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FetchError;
    use crate::state::{Command, Message, Settings};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;
    use ratatui::Terminal;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn render(state: &ViewState, width: u16, height: u16) -> Buffer {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| draw_at(frame, state, fixed_now()))
            .unwrap();
        terminal.backend().buffer().clone()
    }

    fn screen_text(buffer: &Buffer) -> String {
        buffer.content.iter().map(|cell| cell.symbol()).collect()
    }

    fn post(id: &str, title: &str) -> Post {
        Post {
            id: id.into(),
            title: title.into(),
            author: "ferris".into(),
            score: 1234,
            num_comments: 56,
            selftext: "Body text for the post.".into(),
            url: String::new(),
            subreddit: "rust".into(),
            permalink: format!("/r/rust/comments/{id}/"),
            created_utc: 1_699_996_400.0,
        }
    }

    fn loaded(width: u16, height: u16) -> ViewState {
        let (mut state, command) = ViewState::new("rust", Settings::default(), width, height);
        let Command::FetchPosts(request) = command else {
            panic!("expected initial fetch");
        };
        state.handle_message(Message::PostsLoaded {
            request,
            result: Ok(vec![post("a", "Borrow checker tips"), post("b", "Async in 2024")]),
        });
        state
    }

    #[test]
    fn render_is_idempotent() {
        let mut state = loaded(80, 24);
        state.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        let first = render(&state, 80, 24);
        let second = render(&state, 80, 24);
        assert_eq!(first, second);
    }

    #[test]
    fn list_shows_titles_and_meta() {
        let state = loaded(80, 24);
        let text = screen_text(&render(&state, 80, 24));
        assert!(text.contains("Borrow checker tips"));
        assert!(text.contains("u/ferris"));
        assert!(text.contains("1.2K"));
        assert!(text.contains("1h"));
        assert!(text.contains("Post 1/2"));
        assert!(text.contains("r/rust"));
    }

    #[test]
    fn detail_pane_shows_body() {
        let mut state = loaded(80, 24);
        state.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        let text = screen_text(&render(&state, 80, 24));
        assert!(text.contains("Body text for the post."));
    }

    #[test]
    fn initial_failure_renders_error_screen() {
        let (mut state, command) = ViewState::new("rust", Settings::default(), 60, 20);
        let Command::FetchPosts(request) = command else {
            panic!("expected initial fetch");
        };
        state.handle_message(Message::PostsLoaded {
            request,
            result: Err(FetchError::Failed("dns error".into())),
        });
        let text = screen_text(&render(&state, 60, 20));
        assert!(text.contains("Press q to quit or F5 to retry"));
        assert!(text.contains("dns error"));
    }

    #[test]
    fn loading_screen_before_first_feed() {
        let (state, _) = ViewState::new("rust", Settings::default(), 60, 20);
        let text = screen_text(&render(&state, 60, 20));
        assert!(text.contains("Loading r/rust..."));
    }

    #[test]
    fn tiny_terminals_do_not_panic() {
        let mut state = loaded(80, 24);
        state.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        for (width, height) in [(1, 1), (2, 3), (10, 4), (3, 30)] {
            state.resize(width, height);
            render(&state, width, height);
        }
    }
}
