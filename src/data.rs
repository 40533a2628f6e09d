use std::sync::Arc;

use crate::reddit::{self, Comment, Post};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("fetch failed: {0}")]
    Failed(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

pub trait FeedService: Send + Sync {
    fn fetch_posts(&self, source: &str) -> Result<Vec<Post>, FetchError>;
}

pub trait CommentService: Send + Sync {
    fn fetch_comments(&self, source: &str, post_id: &str) -> Result<Vec<Comment>, FetchError>;
}

pub struct RedditFeedService {
    client: Arc<reddit::Client>,
}

impl RedditFeedService {
    pub fn new(client: Arc<reddit::Client>) -> Self {
        Self { client }
    }
}

impl FeedService for RedditFeedService {
    fn fetch_posts(&self, source: &str) -> Result<Vec<Post>, FetchError> {
        self.client.posts(source)
    }
}

pub struct RedditCommentService {
    client: Arc<reddit::Client>,
}

impl RedditCommentService {
    pub fn new(client: Arc<reddit::Client>) -> Self {
        Self { client }
    }
}

impl CommentService for RedditCommentService {
    fn fetch_comments(&self, source: &str, post_id: &str) -> Result<Vec<Comment>, FetchError> {
        self.client.comments(source, post_id)
    }
}

/// Offline feed used by `--offline`.
#[derive(Default)]
pub struct MockFeedService;

impl FeedService for MockFeedService {
    fn fetch_posts(&self, source: &str) -> Result<Vec<Post>, FetchError> {
        Ok(mock_posts(source))
    }
}

#[derive(Default)]
pub struct MockCommentService;

impl CommentService for MockCommentService {
    fn fetch_comments(&self, _source: &str, post_id: &str) -> Result<Vec<Comment>, FetchError> {
        let reply = mock_comment(
            &format!("{post_id}-r1"),
            "rview",
            "Replies are nested under their parent and can be folded with z.",
            1,
            1,
            Vec::new(),
        );
        Ok(vec![
            mock_comment(
                &format!("{post_id}-c1"),
                "team",
                "Comments are unavailable offline, so here is a sample thread.",
                7,
                0,
                vec![reply],
            ),
            mock_comment(
                &format!("{post_id}-c2"),
                "visitor",
                "Press Esc to return to the post.",
                2,
                0,
                Vec::new(),
            ),
        ])
    }
}

fn mock_comment(
    id: &str,
    author: &str,
    body: &str,
    score: i64,
    depth: usize,
    replies: Vec<Comment>,
) -> Comment {
    Comment {
        id: id.into(),
        author: author.into(),
        body: body.into(),
        score,
        depth,
        replies,
        collapsed: false,
    }
}

fn mock_posts(source: &str) -> Vec<Post> {
    let samples = [
        (
            "welcome",
            "Welcome to RView".to_string(),
            "team",
            "Browse subreddits from your terminal.\n\nUse j/k to move, Enter to open a post, c for comments.",
        ),
        (
            "shortcuts",
            "Keyboard shortcuts".to_string(),
            "rview",
            "Ctrl+F: search  Ctrl+R: switch subreddit  F5: refresh  w: open in browser  q: quit",
        ),
        (
            "offline",
            format!("Sample posts for r/{source}"),
            "offline",
            "No network requests are made in offline mode.",
        ),
    ];

    samples
        .into_iter()
        .enumerate()
        .map(|(idx, (id, title, author, body))| Post {
            id: id.into(),
            title,
            author: author.into(),
            score: 100 * (idx as i64 + 1),
            num_comments: 2,
            selftext: body.into(),
            url: String::new(),
            subreddit: source.into(),
            permalink: format!("/r/{source}/comments/{id}/"),
            created_utc: 0.0,
        })
        .collect()
}
