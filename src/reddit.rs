use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::data::FetchError;

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
pub const WEB_BASE_URL: &str = "https://www.reddit.com";

const POST_KIND: &str = "t3";
const COMMENT_KIND: &str = "t1";
/// Replies nested deeper than this are dropped when decoding.
pub const MAX_REPLY_DEPTH: usize = 3;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub user_agent: String,
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub limit: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("rview/{}", crate::VERSION),
            base_url: None,
            timeout: Duration::from_secs(10),
            limit: 50,
        }
    }
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
    limit: u32,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("reddit client user agent required");
        }
        let mut base = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;
        let http = HttpClient::builder().timeout(config.timeout).build()?;

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
            limit: config.limit.max(1),
        })
    }

    pub fn posts(&self, subreddit: &str) -> Result<Vec<Post>, FetchError> {
        let path = format!("r/{}.json", path_segment(subreddit)?);
        let limit = self.limit.to_string();
        let payload = self.get_json(&path, &[("limit", limit.as_str()), ("raw_json", "1")])?;
        decode_posts(payload)
    }

    pub fn comments(&self, subreddit: &str, article: &str) -> Result<Vec<Comment>, FetchError> {
        let path = format!(
            "r/{}/comments/{}.json",
            path_segment(subreddit)?,
            path_segment(article)?
        );
        let payload = self.get_json(&path, &[("raw_json", "1")])?;
        decode_comments(payload)
    }

    fn get_json(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, FetchError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|err| FetchError::Failed(format!("invalid url: {err}")))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }

        tracing::debug!(%url, "reddit request");
        let resp = self
            .http
            .get(url)
            .header(USER_AGENT, self.user_agent.clone())
            .send()
            .map_err(|err| FetchError::Failed(err.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                403 => FetchError::Failed("reddit: forbidden (private or quarantined?)".into()),
                404 => FetchError::Failed("reddit: not found".into()),
                429 => FetchError::Failed("reddit: rate limited".into()),
                _ => FetchError::Failed(format!("reddit: api error {status}")),
            });
        }

        let body = resp
            .text()
            .map_err(|err| FetchError::Failed(err.to_string()))?;
        serde_json::from_str(&body).map_err(|err| FetchError::Decode(err.to_string()))
    }
}

/// Subreddit names and post ids are used as single URL path segments, so
/// only the characters reddit allows in them get through.
fn path_segment(name: &str) -> Result<&str, FetchError> {
    let name = name.trim_start_matches("r/");
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '+');
    if valid {
        Ok(name)
    } else {
        Err(FetchError::Failed(format!("invalid name '{name}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub created_utc: f64,
}

impl Post {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        if self.created_utc <= 0.0 {
            return None;
        }
        DateTime::from_timestamp(self.created_utc.trunc() as i64, 0)
    }

    /// Link to somewhere other than reddit itself.
    pub fn external_url(&self) -> Option<&str> {
        let url = self.url.trim();
        if url.is_empty() || url.contains("reddit.com") {
            None
        } else {
            Some(url)
        }
    }

    /// Address to open in a browser: the permalink, falling back to the
    /// submitted url.
    pub fn web_url(&self) -> Option<String> {
        let target = if self.permalink.trim().is_empty() {
            self.url.trim()
        } else {
            self.permalink.trim()
        };
        if target.is_empty() {
            None
        } else if target.starts_with('/') {
            Some(format!("{WEB_BASE_URL}{target}"))
        } else {
            Some(target.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub body: String,
    pub score: i64,
    pub depth: usize,
    pub replies: Vec<Comment>,
    pub collapsed: bool,
}

impl Comment {
    pub fn descendant_count(&self) -> usize {
        self.replies
            .iter()
            .map(|reply| 1 + reply.descendant_count())
            .sum()
    }
}

impl<'de> Deserialize<'de> for Comment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct CommentHelper {
            id: String,
            #[serde(default)]
            author: String,
            #[serde(default)]
            body: String,
            #[serde(default)]
            score: i64,
            #[serde(default)]
            depth: usize,
            #[serde(default)]
            replies: Value,
        }

        let helper = CommentHelper::deserialize(deserializer)?;
        let replies = if helper.replies.is_object() {
            serde_json::from_value::<ListingEnvelope>(helper.replies)
                .map(|listing| comments_from_listing(listing.data))
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        Ok(Comment {
            id: helper.id,
            author: helper.author,
            body: helper.body,
            score: helper.score,
            depth: helper.depth,
            replies,
            collapsed: false,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ListingEnvelope {
    data: Listing,
}

#[derive(Debug, Clone, Deserialize)]
struct Listing {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Clone, Deserialize)]
struct Thing {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    data: Value,
}

fn comments_from_listing(listing: Listing) -> Vec<Comment> {
    listing
        .children
        .into_iter()
        .filter(|thing| thing.kind == COMMENT_KIND)
        .filter_map(|thing| serde_json::from_value::<Comment>(thing.data).ok())
        .collect()
}

pub fn decode_posts(payload: Value) -> Result<Vec<Post>, FetchError> {
    let envelope: ListingEnvelope = serde_json::from_value(payload)
        .map_err(|err| FetchError::Decode(format!("post listing: {err}")))?;
    envelope
        .data
        .children
        .into_iter()
        .filter(|thing| thing.kind == POST_KIND)
        .map(|thing| {
            serde_json::from_value::<Post>(thing.data)
                .map_err(|err| FetchError::Decode(format!("post: {err}")))
        })
        .collect()
}

/// Accepts reddit's native `[post listing, comment listing]` pair as well as
/// a bare comment listing.
pub fn decode_comments(payload: Value) -> Result<Vec<Comment>, FetchError> {
    let listing = match payload {
        Value::Array(mut parts) if parts.len() >= 2 => parts.swap_remove(1),
        Value::Object(_) => payload,
        _ => return Err(FetchError::Decode("comments payload missing elements".into())),
    };
    let envelope: ListingEnvelope = serde_json::from_value(listing)
        .map_err(|err| FetchError::Decode(format!("comment listing: {err}")))?;
    let mut comments = comments_from_listing(envelope.data);
    assign_depths(&mut comments, 0);
    Ok(comments)
}

fn assign_depths(comments: &mut [Comment], depth: usize) {
    for comment in comments.iter_mut() {
        comment.depth = depth;
        if depth >= MAX_REPLY_DEPTH {
            comment.replies.clear();
        } else {
            assign_depths(&mut comment.replies, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn comment_json(id: &str, body: &str, replies: Value) -> Value {
        json!({
            "kind": "t1",
            "data": { "id": id, "author": "ann", "body": body, "score": 3, "replies": replies }
        })
    }

    #[test]
    fn decodes_post_listing_and_skips_other_kinds() {
        let payload = json!({
            "kind": "Listing",
            "data": {
                "after": null,
                "children": [
                    { "kind": "t3", "data": { "id": "a1", "title": "Hello", "author": "bob", "score": 12, "num_comments": 4, "created_utc": 1700000000.0 } },
                    { "kind": "t5", "data": { "id": "sub" } }
                ]
            }
        });
        let posts = decode_posts(payload).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Hello");
        assert_eq!(posts[0].num_comments, 4);
        assert!(posts[0].created_at().is_some());
    }

    #[test]
    fn malformed_listing_is_decode_error() {
        let err = decode_posts(json!({ "unexpected": true })).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn decodes_native_comment_pair_with_nested_replies() {
        let nested = json!({
            "kind": "Listing",
            "data": { "children": [
                comment_json("c2", "reply", Value::String(String::new())),
                { "kind": "more", "data": { "id": "more1", "count": 10 } }
            ] }
        });
        let payload = json!([
            { "kind": "Listing", "data": { "children": [] } },
            { "kind": "Listing", "data": { "children": [ comment_json("c1", "top", nested) ] } }
        ]);
        let comments = decode_comments(payload).unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].replies.len(), 1);
        assert_eq!(comments[0].replies[0].id, "c2");
        assert_eq!(comments[0].replies[0].depth, 1);
        assert_eq!(comments[0].descendant_count(), 1);
    }

    #[test]
    fn decodes_bare_comment_listing() {
        let payload = json!({
            "kind": "Listing",
            "data": { "children": [ comment_json("c1", "solo", Value::Null) ] }
        });
        let comments = decode_comments(payload).unwrap();
        assert_eq!(comments[0].body, "solo");
    }

    #[test]
    fn replies_beyond_depth_limit_are_dropped() {
        let mut replies = Value::String(String::new());
        for depth in (0..6).rev() {
            let child = comment_json(&format!("c{depth}"), "x", replies);
            replies = json!({ "kind": "Listing", "data": { "children": [child] } });
        }
        let comments = decode_comments(replies).unwrap();
        let mut node = &comments[0];
        let mut levels = 0;
        while let Some(next) = node.replies.first() {
            node = next;
            levels += 1;
        }
        assert_eq!(levels, MAX_REPLY_DEPTH);
    }

    #[test]
    fn web_url_prefers_permalink() {
        let post = Post {
            id: "x".into(),
            title: String::new(),
            author: String::new(),
            score: 0,
            num_comments: 0,
            selftext: String::new(),
            url: "https://example.com/a".into(),
            subreddit: "rust".into(),
            permalink: "/r/rust/comments/x/".into(),
            created_utc: 0.0,
        };
        assert_eq!(
            post.web_url().as_deref(),
            Some("https://www.reddit.com/r/rust/comments/x/")
        );
        assert_eq!(post.external_url(), Some("https://example.com/a"));
        assert!(post.created_at().is_none());
    }

    #[test]
    fn client_requires_user_agent() {
        let config = ClientConfig {
            user_agent: "  ".into(),
            ..ClientConfig::default()
        };
        assert!(Client::new(config).is_err());
    }

    #[test]
    fn names_outside_a_single_path_segment_are_rejected() {
        let client = Client::new(ClientConfig::default()).unwrap();
        assert!(matches!(client.posts("../api"), Err(FetchError::Failed(_))));
        assert!(matches!(client.posts(""), Err(FetchError::Failed(_))));
        assert!(matches!(
            client.comments("rust", "abc/../../x"),
            Err(FetchError::Failed(_))
        ));
        assert!(matches!(
            client.comments("a%2F..", "abc"),
            Err(FetchError::Failed(_))
        ));
    }

    #[test]
    fn path_segment_accepts_reddit_names() {
        assert_eq!(path_segment("rust").unwrap(), "rust");
        assert_eq!(path_segment("r/golang").unwrap(), "golang");
        assert_eq!(path_segment("rust+golang").unwrap(), "rust+golang");
        assert_eq!(path_segment("Ask_Me").unwrap(), "Ask_Me");
    }
}
