use crate::reddit::Comment;
use crate::text;

/// Only this many top-level comments are kept per post.
pub const MAX_TOP_LEVEL_COMMENTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Header,
    Body,
    Separator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentLine {
    pub kind: LineKind,
    pub depth: usize,
    pub comment_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct CommentTree {
    roots: Vec<Comment>,
}

impl CommentTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all(&mut self, mut roots: Vec<Comment>) {
        roots.truncate(MAX_TOP_LEVEL_COMMENTS);
        self.roots = roots;
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn roots(&self) -> &[Comment] {
        &self.roots
    }

    /// Flips the collapsed flag of the comment with `id`. Returns false when
    /// no such comment exists.
    pub fn toggle_collapse(&mut self, id: &str) -> bool {
        let mut stack: Vec<&mut Comment> = self.roots.iter_mut().collect();
        while let Some(node) = stack.pop() {
            if node.id == id {
                node.collapsed = !node.collapsed;
                return true;
            }
            stack.extend(node.replies.iter_mut());
        }
        false
    }

    /// Pre-order rendering of the visible comments. The replies of a
    /// collapsed comment are skipped whatever their own flags say.
    pub fn flatten(&self, width: usize) -> Vec<CommentLine> {
        let mut lines = Vec::new();
        let mut stack: Vec<(&Comment, usize)> =
            self.roots.iter().rev().map(|comment| (comment, 0)).collect();

        while let Some((node, depth)) = stack.pop() {
            let indent = "  ".repeat(depth);
            lines.push(CommentLine {
                kind: LineKind::Header,
                depth,
                comment_id: node.id.clone(),
                text: format!("{indent}{}", header_text(node)),
            });

            let body_indent = format!("{indent}  ");
            let body_width = width.saturating_sub(body_indent.len()).max(1);
            let mut body = text::wrap_paragraphs(&node.body, body_width);
            if body.is_empty() {
                body.push("(no comment body)".to_string());
            }
            lines.extend(body.into_iter().map(|line| CommentLine {
                kind: if line.is_empty() {
                    LineKind::Separator
                } else {
                    LineKind::Body
                },
                depth,
                comment_id: node.id.clone(),
                text: if line.is_empty() {
                    line
                } else {
                    format!("{body_indent}{line}")
                },
            }));

            lines.push(CommentLine {
                kind: LineKind::Separator,
                depth,
                comment_id: node.id.clone(),
                text: String::new(),
            });

            if !node.collapsed {
                stack.extend(node.replies.iter().rev().map(|reply| (reply, depth + 1)));
            }
        }
        lines
    }
}

fn header_text(comment: &Comment) -> String {
    let author = if comment.author.trim().is_empty() {
        "[deleted]"
    } else {
        comment.author.as_str()
    };
    let marker = if comment.collapsed { "[+]" } else { "[-]" };
    let mut header = format!(
        "{marker} u/{author} · ⬆ {}",
        text::format_count(comment.score)
    );
    if comment.collapsed {
        let hidden = comment.descendant_count();
        if hidden > 0 {
            let suffix = if hidden == 1 { "reply" } else { "replies" };
            header.push_str(&format!(" · {hidden} hidden {suffix}"));
        }
    }
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: &str, body: &str, replies: Vec<Comment>) -> Comment {
        Comment {
            id: id.into(),
            author: format!("user_{id}"),
            body: body.into(),
            score: 10,
            depth: 0,
            replies,
            collapsed: false,
        }
    }

    fn thread() -> CommentTree {
        let mut tree = CommentTree::new();
        tree.replace_all(vec![
            comment(
                "a",
                "top level",
                vec![comment("a1", "first reply", vec![comment("a1x", "deep", vec![])])],
            ),
            comment("b", "second", vec![]),
        ]);
        tree
    }

    fn headers(lines: &[CommentLine]) -> Vec<&str> {
        lines
            .iter()
            .filter(|line| line.kind == LineKind::Header)
            .map(|line| line.comment_id.as_str())
            .collect()
    }

    #[test]
    fn flatten_is_preorder_with_indentation() {
        let lines = thread().flatten(40);
        assert_eq!(headers(&lines), vec!["a", "a1", "a1x", "b"]);
        let reply_header = lines
            .iter()
            .find(|line| line.comment_id == "a1" && line.kind == LineKind::Header)
            .unwrap();
        assert!(reply_header.text.starts_with("  [-] u/user_a1"));
        let reply_body = lines
            .iter()
            .find(|line| line.comment_id == "a1" && line.kind == LineKind::Body)
            .unwrap();
        assert_eq!(reply_body.text, "    first reply");
    }

    #[test]
    fn each_comment_ends_with_separator() {
        let lines = thread().flatten(40);
        assert_eq!(lines.len(), 4 * 3);
        assert_eq!(lines.last().map(|l| l.kind), Some(LineKind::Separator));
    }

    #[test]
    fn collapsed_comment_hides_descendants_only() {
        let mut tree = thread();
        assert!(tree.toggle_collapse("a1"));
        let lines = tree.flatten(40);
        assert_eq!(headers(&lines), vec!["a", "a1", "b"]);
        assert!(lines.iter().any(|l| l.text.contains("1 hidden reply")));

        assert!(tree.toggle_collapse("a"));
        assert_eq!(headers(&tree.flatten(40)), vec!["a", "b"]);

        // a1 keeps its own flag while hidden under a.
        assert!(tree.toggle_collapse("a"));
        assert_eq!(headers(&tree.flatten(40)), vec!["a", "a1", "b"]);
    }

    #[test]
    fn toggle_unknown_id_is_noop() {
        let mut tree = thread();
        assert!(!tree.toggle_collapse("missing"));
    }

    #[test]
    fn body_wraps_within_indented_width() {
        let mut tree = CommentTree::new();
        tree.replace_all(vec![comment(
            "a",
            "",
            vec![comment("b", "alpha beta gamma delta", vec![])],
        )]);
        let lines = tree.flatten(16);
        let body: Vec<&str> = lines
            .iter()
            .filter(|l| l.comment_id == "b" && l.kind == LineKind::Body)
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(body, vec!["    alpha beta", "    gamma delta"]);
        assert!(lines.iter().any(|l| l.text == "  (no comment body)"));
    }

    #[test]
    fn replace_all_caps_top_level() {
        let mut tree = CommentTree::new();
        tree.replace_all((0..9).map(|i| comment(&i.to_string(), "x", vec![])).collect());
        assert_eq!(tree.roots().len(), MAX_TOP_LEVEL_COMMENTS);
        tree.clear();
        assert!(tree.is_empty());
        assert!(tree.flatten(40).is_empty());
    }
}
