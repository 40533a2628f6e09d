use crate::reddit::Post;
use crate::text;

/// Posts for the current source plus the view of them that matches the
/// search query. The filtered view is only ever rebuilt from `all` and
/// `query`.
#[derive(Debug, Clone, Default)]
pub struct FeedStore {
    all: Vec<Post>,
    filtered: Vec<usize>,
    query: String,
    selected: usize,
}

impl FeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the feed, keeping the current query.
    pub fn load(&mut self, posts: Vec<Post>) {
        self.all = posts;
        self.refilter();
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_lowercase();
        self.refilter();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    fn refilter(&mut self) {
        self.filtered = self
            .all
            .iter()
            .enumerate()
            .filter(|(_, post)| matches_query(post, &self.query))
            .map(|(idx, _)| idx)
            .collect();
        self.selected = 0;
    }

    /// Moves the selection by `delta`, stopping at either end. Returns
    /// whether the selection changed.
    pub fn move_selection(&mut self, delta: isize) -> bool {
        if delta == 0 || self.filtered.is_empty() {
            return false;
        }
        let target = if delta.is_negative() {
            self.selected.saturating_sub(delta.unsigned_abs())
        } else {
            self.selected.saturating_add(delta.unsigned_abs())
        };
        self.select(target)
    }

    /// Selects `index`, clamped to the last filtered post.
    pub fn select(&mut self, index: usize) -> bool {
        let Some(last) = self.filtered.len().checked_sub(1) else {
            return false;
        };
        let index = index.min(last);
        let changed = index != self.selected;
        self.selected = index;
        changed
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn current_post(&self) -> Option<&Post> {
        self.filtered
            .get(self.selected)
            .and_then(|idx| self.all.get(*idx))
    }

    pub fn filtered(&self) -> impl ExactSizeIterator<Item = &Post> + '_ {
        self.filtered.iter().map(move |idx| &self.all[*idx])
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn all_posts(&self) -> &[Post] {
        &self.all
    }

    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }
}

fn matches_query(post: &Post, query: &str) -> bool {
    query.is_empty()
        || post.title.to_lowercase().contains(query)
        || post.author.to_lowercase().contains(query)
}

/// Scrollable body of the detail pane: wrapped self text followed by the
/// outbound link, if any.
pub fn detail_lines(post: &Post, width: usize) -> Vec<String> {
    let mut lines = text::wrap_paragraphs(&post.selftext, width);
    if let Some(url) = post.external_url() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!(
            "Link: {}",
            text::truncate(url, width.saturating_sub(6))
        ));
    }
    if lines.is_empty() {
        lines.push("(no text)".to_string());
    }
    lines
}
