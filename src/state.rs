//! View state and the key/event transitions that drive it.
//!
//! `ViewState` is owned by the event loop and mutated one event at a time.
//! Side effects never run here; transitions hand back a [`Command`] for the
//! runtime to execute, and fetch results come back in as [`Message`]s tagged
//! with the request they answer.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::comments::{CommentLine, CommentTree};
use crate::config;
use crate::data::FetchError;
use crate::feed::{self, FeedStore};
use crate::layout::{self, PaneLayout, Panes};
use crate::reddit::{Comment, Post};
use crate::scroll::{self, Scroll, Window, COMMENTS_HEADER_ROWS, DETAIL_HEADER_ROWS};

pub const SEARCH_CHAR_LIMIT: usize = 100;
pub const SOURCE_CHAR_LIMIT: usize = 50;

/// Navigation context underneath the input-capture modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Browsing,
    ViewingDetail,
    ViewingComments,
}

impl From<Nav> for Mode {
    fn from(nav: Nav) -> Self {
        match nav {
            Nav::Browsing => Mode::Browsing,
            Nav::ViewingDetail => Mode::ViewingDetail,
            Nav::ViewingComments => Mode::ViewingComments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Browsing,
    Searching {
        input: String,
        previous_query: String,
        previous_selection: usize,
        resume: Nav,
    },
    SelectingSource {
        input: String,
        resume: Nav,
    },
    ViewingDetail,
    ViewingComments,
}

impl Mode {
    pub fn nav(&self) -> Nav {
        match self {
            Mode::Browsing => Nav::Browsing,
            Mode::ViewingDetail => Nav::ViewingDetail,
            Mode::ViewingComments => Nav::ViewingComments,
            Mode::Searching { resume, .. } | Mode::SelectingSource { resume, .. } => *resume,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentsStatus {
    NotLoaded,
    Loading { request_id: u64 },
    Loaded,
    Failed(String),
}

/// Comments for a single post. `post_id` names the post they belong to.
#[derive(Debug, Clone)]
pub struct CommentPanel {
    pub tree: CommentTree,
    pub status: CommentsStatus,
    pub post_id: Option<String>,
    pub scroll: usize,
}

impl Default for CommentPanel {
    fn default() -> Self {
        Self {
            tree: CommentTree::new(),
            status: CommentsStatus::NotLoaded,
            post_id: None,
            scroll: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub list_cap: u16,
    pub max_title_length: usize,
    pub detail_page: usize,
    pub comment_page: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            list_cap: 10,
            max_title_length: 80,
            detail_page: 10,
            comment_page: 5,
        }
    }
}

impl From<&config::Config> for Settings {
    fn from(cfg: &config::Config) -> Self {
        Self {
            list_cap: u16::try_from(cfg.ui.list_height).unwrap_or(u16::MAX),
            max_title_length: cfg.ui.max_title_length as usize,
            detail_page: cfg.ui.detail_page_step as usize,
            comment_page: cfg.ui.comment_page_step as usize,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostsRequest {
    pub id: u64,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentsRequest {
    pub id: u64,
    pub source: String,
    pub post_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    FetchPosts(PostsRequest),
    FetchComments(CommentsRequest),
    OpenUrl(String),
}

#[derive(Debug, Clone)]
pub enum Message {
    PostsLoaded {
        request: PostsRequest,
        result: Result<Vec<Post>, FetchError>,
    },
    CommentsLoaded {
        request: CommentsRequest,
        result: Result<Vec<Comment>, FetchError>,
    },
}

pub struct ViewState {
    mode: Mode,
    source: String,
    feed_source: Option<String>,
    load_status: LoadStatus,
    feed: FeedStore,
    comments: CommentPanel,
    detail_scroll: usize,
    width: u16,
    height: u16,
    settings: Settings,
    next_request_id: u64,
    pending_posts: Option<u64>,
    spinner: usize,
    notice: Option<String>,
}

impl ViewState {
    /// Creates the state in `Loading` and returns the initial feed request.
    pub fn new(source: &str, settings: Settings, width: u16, height: u16) -> (Self, Command) {
        let mut state = Self {
            mode: Mode::Browsing,
            source: config::normalize_source(source),
            feed_source: None,
            load_status: LoadStatus::Loading,
            feed: FeedStore::new(),
            comments: CommentPanel::default(),
            detail_scroll: 0,
            width,
            height,
            settings,
            next_request_id: 1,
            pending_posts: None,
            spinner: 0,
            notice: None,
        };
        let command = state.request_posts();
        (state, command)
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Source of the posts currently on screen, which lags `source` until a
    /// requested feed arrives.
    pub fn displayed_source(&self) -> &str {
        self.feed_source.as_deref().unwrap_or(&self.source)
    }

    pub fn load_status(&self) -> &LoadStatus {
        &self.load_status
    }

    pub fn feed(&self) -> &FeedStore {
        &self.feed
    }

    pub fn comments(&self) -> &CommentPanel {
        &self.comments
    }

    pub fn detail_scroll(&self) -> usize {
        self.detail_scroll
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn spinner(&self) -> usize {
        self.spinner
    }

    pub fn has_feed(&self) -> bool {
        self.feed_source.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.load_status == LoadStatus::Loading
            || matches!(self.comments.status, CommentsStatus::Loading { .. })
    }

    pub fn set_notice(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
    }

    pub fn panes(&self) -> Panes {
        match self.mode {
            Mode::Searching { .. } => Panes::List,
            _ => match self.mode.nav() {
                Nav::Browsing => Panes::List,
                Nav::ViewingDetail => Panes::ListDetail,
                Nav::ViewingComments => Panes::ListDetailComments,
            },
        }
    }

    pub fn layout_for(&self, width: u16, height: u16) -> PaneLayout {
        layout::compute(self.panes(), width, height, self.settings.list_cap)
    }

    pub fn layout(&self) -> PaneLayout {
        self.layout_for(self.width, self.height)
    }

    pub fn detail_content(&self, width: usize) -> Vec<String> {
        self.feed
            .current_post()
            .map(|post| feed::detail_lines(post, width))
            .unwrap_or_default()
    }

    /// Comment lines for the current post, or nothing when the loaded tree
    /// belongs to another post.
    pub fn comment_lines(&self, width: usize) -> Vec<CommentLine> {
        if !self.comments_match_selection() {
            return Vec::new();
        }
        self.comments.tree.flatten(width)
    }

    pub fn detail_window(&self) -> Option<Window> {
        let area = layout::text_area(self.layout().detail?);
        let total = self.detail_content(usize::from(area.width)).len();
        Some(scroll::window(
            total,
            usize::from(area.height),
            DETAIL_HEADER_ROWS,
            self.detail_scroll,
        ))
    }

    pub fn comments_window(&self) -> Option<Window> {
        let area = layout::text_area(self.layout().comments?);
        let total = self.comment_lines(usize::from(area.width)).len();
        Some(scroll::window(
            total,
            usize::from(area.height),
            COMMENTS_HEADER_ROWS,
            self.comments.scroll,
        ))
    }

    fn comments_match_selection(&self) -> bool {
        match (&self.comments.post_id, self.feed.current_post()) {
            (Some(id), Some(post)) => *id == post.id,
            _ => false,
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        id
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.clamp_scrolls();
    }

    fn clamp_scrolls(&mut self) {
        self.detail_scroll = self.detail_window().map_or(0, |win| win.offset);
        self.comments.scroll = self.comments_window().map_or(0, |win| win.offset);
    }

    /// Advances the spinner while something is loading. Returns whether a
    /// redraw is needed.
    pub fn tick(&mut self) -> bool {
        if self.is_loading() {
            self.spinner = self.spinner.wrapping_add(1);
            true
        } else {
            self.spinner = 0;
            false
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Command> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            return Some(Command::Quit);
        }
        self.notice = None;

        match self.mode {
            Mode::Searching { .. } => self.handle_search_key(key),
            Mode::SelectingSource { .. } => self.handle_source_key(key),
            _ => self.handle_navigation_key(key, self.mode.nav()),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Option<Command> {
        let Mode::Searching {
            input,
            previous_query,
            previous_selection,
            resume,
        } = &mut self.mode
        else {
            return None;
        };
        match key.code {
            KeyCode::Esc => {
                let previous_query = std::mem::take(previous_query);
                let previous_selection = *previous_selection;
                let resume = *resume;
                self.feed.set_query(&previous_query);
                self.feed.select(previous_selection);
                self.mode = resume.into();
                if resume == Nav::ViewingComments && !self.comments_match_selection() {
                    self.mode = Mode::ViewingDetail;
                }
                if self.feed.is_empty() {
                    self.mode = Mode::Browsing;
                }
            }
            KeyCode::Enter => {
                tracing::debug!(query = %input, "search confirmed");
                self.mode = Mode::Browsing;
                self.selection_changed();
            }
            KeyCode::Backspace => {
                if input.pop().is_some() {
                    self.feed.set_query(input.as_str());
                }
            }
            KeyCode::Char(ch) if is_text_input(&key) => {
                if input.chars().count() < SEARCH_CHAR_LIMIT {
                    input.push(ch);
                    self.feed.set_query(input.as_str());
                }
            }
            _ => {}
        }
        None
    }

    fn handle_source_key(&mut self, key: KeyEvent) -> Option<Command> {
        let Mode::SelectingSource { input, resume } = &mut self.mode else {
            return None;
        };
        match key.code {
            KeyCode::Esc => {
                self.mode = (*resume).into();
            }
            KeyCode::Enter => {
                let source = config::normalize_source(input.as_str());
                if source.is_empty() {
                    return None;
                }
                tracing::info!(%source, "switching source");
                self.source = source;
                return Some(self.request_posts());
            }
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(ch) if is_text_input(&key) => {
                if input.chars().count() < SOURCE_CHAR_LIMIT {
                    input.push(ch);
                }
            }
            _ => {}
        }
        None
    }

    fn handle_navigation_key(&mut self, key: KeyEvent, nav: Nav) -> Option<Command> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') if !ctrl => return Some(Command::Quit),
            KeyCode::Char('f') if ctrl => {
                self.mode = Mode::Searching {
                    input: self.feed.query().to_string(),
                    previous_query: self.feed.query().to_string(),
                    previous_selection: self.feed.selected_index(),
                    resume: nav,
                };
                return None;
            }
            KeyCode::Char('r') if ctrl => {
                self.mode = Mode::SelectingSource {
                    input: self.source.clone(),
                    resume: nav,
                };
                return None;
            }
            KeyCode::F(5) => return Some(self.request_posts()),
            KeyCode::Char('w') if !ctrl => return self.open_current_post(),
            _ => {}
        }

        match nav {
            Nav::Browsing => self.handle_browsing_key(key),
            Nav::ViewingDetail => self.handle_detail_key(key),
            Nav::ViewingComments => self.handle_comments_key(key),
        }
    }

    fn handle_browsing_key(&mut self, key: KeyEvent) -> Option<Command> {
        let page = layout::visible_posts(self.layout().list).max(1) as isize;
        let moved = match key.code {
            KeyCode::Up | KeyCode::Char('k') | KeyCode::Left | KeyCode::Char('h') => {
                self.feed.move_selection(-1)
            }
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Right | KeyCode::Char('l') => {
                self.feed.move_selection(1)
            }
            KeyCode::PageUp => self.feed.move_selection(-page),
            KeyCode::PageDown => self.feed.move_selection(page),
            KeyCode::Home => self.feed.select(0),
            KeyCode::End => self.feed.select(usize::MAX),
            KeyCode::Enter => {
                if !self.feed.is_empty() {
                    self.mode = Mode::ViewingDetail;
                    self.detail_scroll = 0;
                }
                false
            }
            _ => false,
        };
        if moved {
            self.selection_changed();
        }
        None
    }

    fn handle_detail_key(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Esc | KeyCode::Tab => {
                self.mode = Mode::Browsing;
                self.detail_scroll = 0;
            }
            KeyCode::Up | KeyCode::Char('k') => self.scroll_detail(Scroll::LineUp),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_detail(Scroll::LineDown),
            KeyCode::PageUp => self.scroll_detail(Scroll::PageUp),
            KeyCode::PageDown => self.scroll_detail(Scroll::PageDown),
            KeyCode::Home => self.scroll_detail(Scroll::Home),
            KeyCode::End => self.scroll_detail(Scroll::End),
            KeyCode::Char('c') => return self.open_comments(),
            KeyCode::Left | KeyCode::Char('h') => {
                self.step_post(-1);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.step_post(1);
            }
            _ => {}
        }
        None
    }

    fn handle_comments_key(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Esc | KeyCode::Tab | KeyCode::Char('c') => {
                self.mode = Mode::ViewingDetail;
                self.comments.scroll = 0;
            }
            KeyCode::Up | KeyCode::Char('k') => self.scroll_comments(Scroll::LineUp),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_comments(Scroll::LineDown),
            KeyCode::PageUp => self.scroll_comments(Scroll::PageUp),
            KeyCode::PageDown => self.scroll_comments(Scroll::PageDown),
            KeyCode::Home => self.scroll_comments(Scroll::Home),
            KeyCode::End => self.scroll_comments(Scroll::End),
            KeyCode::Char('z') => self.toggle_top_comment(),
            KeyCode::Left | KeyCode::Char('h') => {
                if self.step_post(-1) {
                    self.mode = Mode::ViewingDetail;
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if self.step_post(1) {
                    self.mode = Mode::ViewingDetail;
                }
            }
            _ => {}
        }
        None
    }

    fn scroll_detail(&mut self, step: Scroll) {
        let Some(win) = self.detail_window() else {
            return;
        };
        self.detail_scroll = scroll::apply(win.offset, step, self.settings.detail_page, win.max_offset);
    }

    fn scroll_comments(&mut self, step: Scroll) {
        let Some(win) = self.comments_window() else {
            return;
        };
        self.comments.scroll =
            scroll::apply(win.offset, step, self.settings.comment_page, win.max_offset);
    }

    /// Moves to the adjacent post while keeping the current view. Returns
    /// whether the selection moved.
    fn step_post(&mut self, delta: isize) -> bool {
        let moved = self.feed.move_selection(delta);
        if moved {
            self.selection_changed();
        }
        moved
    }

    /// Resets per-post view state and drops comments that no longer match
    /// the selected post.
    fn selection_changed(&mut self) {
        self.detail_scroll = 0;
        self.comments.scroll = 0;
        if self.comments.post_id.is_some() && !self.comments_match_selection() {
            self.comments = CommentPanel::default();
        }
    }

    fn toggle_top_comment(&mut self) {
        let Some(area) = self.layout().comments.map(layout::text_area) else {
            return;
        };
        let lines = self.comment_lines(usize::from(area.width));
        let Some(win) = self.comments_window() else {
            return;
        };
        let Some(line) = lines.get(win.offset) else {
            return;
        };
        let id = line.comment_id.clone();
        self.comments.tree.toggle_collapse(&id);
        self.clamp_scrolls();
    }

    fn open_comments(&mut self) -> Option<Command> {
        let post = self.feed.current_post()?;
        let post_id = post.id.clone();
        let source = if post.subreddit.trim().is_empty() {
            self.source.clone()
        } else {
            post.subreddit.clone()
        };
        self.mode = Mode::ViewingComments;
        self.comments.scroll = 0;

        if self.comments_match_selection()
            && matches!(
                self.comments.status,
                CommentsStatus::Loaded | CommentsStatus::Loading { .. }
            )
        {
            return None;
        }

        let id = self.next_id();
        tracing::info!(%source, %post_id, request_id = id, "requesting comments");
        self.comments = CommentPanel {
            tree: CommentTree::new(),
            status: CommentsStatus::Loading { request_id: id },
            post_id: Some(post_id.clone()),
            scroll: 0,
        };
        Some(Command::FetchComments(CommentsRequest {
            id,
            source,
            post_id,
        }))
    }

    fn open_current_post(&mut self) -> Option<Command> {
        let url = self.feed.current_post()?.web_url()?;
        Some(Command::OpenUrl(url))
    }

    fn request_posts(&mut self) -> Command {
        let id = self.next_id();
        tracing::info!(source = %self.source, request_id = id, "requesting posts");
        self.pending_posts = Some(id);
        self.load_status = LoadStatus::Loading;
        self.mode = Mode::Browsing;
        self.detail_scroll = 0;
        Command::FetchPosts(PostsRequest {
            id,
            source: self.source.clone(),
        })
    }

    pub fn handle_message(&mut self, message: Message) {
        match message {
            Message::PostsLoaded { request, result } => self.posts_loaded(request, result),
            Message::CommentsLoaded { request, result } => self.comments_loaded(request, result),
        }
    }

    fn posts_loaded(&mut self, request: PostsRequest, result: Result<Vec<Post>, FetchError>) {
        if self.pending_posts != Some(request.id) || request.source != self.source {
            tracing::debug!(request_id = request.id, source = %request.source, "discarding stale posts");
            return;
        }
        self.pending_posts = None;

        match result {
            Ok(posts) => {
                tracing::info!(source = %request.source, count = posts.len(), "posts loaded");
                self.feed.load(posts);
                self.feed_source = Some(request.source);
                self.load_status = LoadStatus::Idle;
                self.detail_scroll = 0;
                self.comments = CommentPanel::default();
                match &mut self.mode {
                    Mode::Searching {
                        resume,
                        previous_selection,
                        ..
                    } => {
                        *resume = Nav::Browsing;
                        *previous_selection = 0;
                    }
                    Mode::SelectingSource { resume, .. } => *resume = Nav::Browsing,
                    mode => *mode = Mode::Browsing,
                }
            }
            Err(err) => {
                tracing::warn!(source = %request.source, error = %err, "posts failed to load");
                self.load_status = LoadStatus::Error(format!("r/{}: {err}", request.source));
            }
        }
    }

    fn comments_loaded(
        &mut self,
        request: CommentsRequest,
        result: Result<Vec<Comment>, FetchError>,
    ) {
        let expected = matches!(
            self.comments.status,
            CommentsStatus::Loading { request_id } if request_id == request.id
        );
        let current = self
            .feed
            .current_post()
            .is_some_and(|post| post.id == request.post_id);
        if !expected || !current {
            tracing::debug!(request_id = request.id, post_id = %request.post_id, "discarding stale comments");
            return;
        }

        match result {
            Ok(comments) => {
                tracing::info!(post_id = %request.post_id, count = comments.len(), "comments loaded");
                self.comments.tree.replace_all(comments);
                self.comments.status = CommentsStatus::Loaded;
            }
            Err(err) => {
                tracing::warn!(post_id = %request.post_id, error = %err, "comments failed to load");
                self.comments.tree.clear();
                self.comments.status = CommentsStatus::Failed(err.to_string());
            }
        }
        self.comments.scroll = 0;
    }
}

fn is_text_input(key: &KeyEvent) -> bool {
    key.modifiers.difference(KeyModifiers::SHIFT).is_empty()
}
