use crate::api::{Comment, FeedItem, ItemId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn from_delta(delta: i32) -> Option<Self> {
        match delta.signum() {
            1 => Some(Direction::Forward),
            -1 => Some(Direction::Backward),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Interaction {
    pub liked: bool,
    pub comment_open: bool,
    pub show_confirmation: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommentDraft {
    pub nickname: String,
    pub text: String,
}

impl CommentDraft {
    pub fn is_submittable(&self) -> bool {
        is_submittable(&self.nickname, &self.text)
    }

    pub fn clear(&mut self) {
        self.nickname.clear();
        self.text.clear();
    }
}

pub fn is_submittable(nickname: &str, text: &str) -> bool {
    !nickname.trim().is_empty() && !text.trim().is_empty()
}

#[derive(Debug, Default)]
pub struct Feed {
    items: Vec<FeedItem>,
    cursor: usize,
    search: String,
    interaction: Interaction,
    comments: Vec<Comment>,
    comments_for: Option<ItemId>,
}

impl Feed {
    pub fn new(items: Vec<FeedItem>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn interaction(&self) -> Interaction {
        self.interaction
    }

    pub fn visible(&self) -> Vec<&FeedItem> {
        self.items
            .iter()
            .filter(|item| item.title.contains(self.search.as_str()))
            .collect()
    }

    pub fn visible_len(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.title.contains(self.search.as_str()))
            .count()
    }

    // Clamped against the filtered view.
    pub fn cursor(&self) -> Option<usize> {
        let len = self.visible_len();
        if len == 0 {
            None
        } else {
            Some(self.cursor.min(len - 1))
        }
    }

    pub fn focused(&self) -> Option<&FeedItem> {
        let index = self.cursor()?;
        self.visible().get(index).copied()
    }

    pub fn focused_id(&self) -> Option<ItemId> {
        self.focused().map(|item| item.id)
    }

    pub fn up_next(&self) -> Option<&FeedItem> {
        let index = self.cursor()?;
        self.visible()
            .get(index + 1)
            .copied()
            .filter(|item| !item.video_url.trim().is_empty())
    }

    pub fn replace_items(&mut self, items: Vec<FeedItem>) {
        self.items = items;
        if let Some(id) = self.comments_for {
            if !self.items.iter().any(|item| item.id == id) {
                self.comments.clear();
                self.comments_for = None;
            }
        }
        self.clamp_cursor();
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into();
        self.clamp_cursor();
    }

    pub fn advance(&mut self, direction: Direction) -> bool {
        if self.interaction.comment_open {
            return false;
        }
        self.clamp_cursor();
        let len = self.visible_len();
        self.cursor = match direction {
            Direction::Forward => (self.cursor + 1).min(len.saturating_sub(1)),
            Direction::Backward => self.cursor.saturating_sub(1),
        };
        self.interaction = Interaction::default();
        true
    }

    pub fn like(&mut self) -> Option<i64> {
        let id = self.focused_id()?;
        let item = self.items.iter_mut().find(|item| item.id == id)?;
        item.like_num += 1;
        self.interaction.liked = true;
        Some(item.like_num)
    }

    pub fn reset_interaction(&mut self) {
        self.interaction = Interaction::default();
    }

    pub fn toggle_comments(&mut self) -> bool {
        self.interaction.comment_open = !self.interaction.comment_open;
        self.interaction.comment_open
    }

    pub fn toggle_confirmation(&mut self) -> bool {
        self.interaction.show_confirmation = !self.interaction.show_confirmation;
        self.interaction.show_confirmation
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn comments_for(&self) -> Option<ItemId> {
        self.comments_for
    }

    pub fn comment_count(&self) -> usize {
        match self.focused() {
            Some(item) if self.comments_for == Some(item.id) => self.comments.len(),
            Some(item) => item.comments.len(),
            None => 0,
        }
    }

    pub fn begin_comments(&mut self, item: ItemId) {
        if self.comments_for != Some(item) {
            self.comments.clear();
            self.comments_for = Some(item);
        }
    }

    pub fn set_comments(&mut self, item: ItemId, comments: Vec<Comment>) {
        self.comments = comments;
        self.comments_for = Some(item);
    }

    pub fn append_comment(&mut self, item: ItemId, comment: Comment) {
        if self.comments_for == Some(item) {
            self.comments.push(comment.clone());
        }
        if let Some(entry) = self.items.iter_mut().find(|entry| entry.id == item) {
            entry.comments.push(comment);
        }
    }

    pub fn remove_item(&mut self, id: ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        if self.items.len() == before {
            return false;
        }
        if self.comments_for == Some(id) {
            self.comments.clear();
            self.comments_for = None;
        }
        self.cursor = self.cursor.saturating_sub(1);
        self.interaction = Interaction::default();
        self.clamp_cursor();
        true
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.visible_len().saturating_sub(1));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn item(id: ItemId, title: &str, likes: i64) -> FeedItem {
        FeedItem {
            id,
            title: title.into(),
            video_url: format!("https://cdn.test/{id}.mp4"),
            like_num: likes,
            comments: Vec::new(),
        }
    }

    #[test]
    fn like_then_advance_resets_flag_but_keeps_count() {
        let mut feed = Feed::new(vec![item(1, "A", 3), item(2, "B", 0)]);
        assert_eq!(feed.like(), Some(4));
        assert!(feed.interaction().liked);

        assert!(feed.advance(Direction::Forward));
        assert_eq!(feed.cursor(), Some(1));
        assert!(!feed.interaction().liked);
        assert_eq!(feed.items()[0].like_num, 4);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut feed = Feed::new(vec![item(1, "a", 0), item(2, "b", 0), item(3, "c", 0)]);
        let steps = [
            Direction::Backward,
            Direction::Forward,
            Direction::Forward,
            Direction::Forward,
            Direction::Forward,
            Direction::Backward,
            Direction::Backward,
            Direction::Backward,
            Direction::Backward,
        ];
        for step in steps {
            feed.advance(step);
            let cursor = feed.cursor().unwrap();
            assert!(cursor < feed.visible_len());
        }
        assert_eq!(feed.cursor(), Some(0));

        let mut empty = Feed::default();
        empty.advance(Direction::Forward);
        empty.advance(Direction::Backward);
        assert_eq!(empty.cursor(), None);
        assert!(empty.focused().is_none());
        assert!(empty.like().is_none());
    }

    #[test]
    fn empty_search_keeps_full_order() {
        let mut feed = Feed::new(vec![item(3, "z", 0), item(1, "a", 0), item(2, "m", 0)]);
        feed.set_search("");
        let ids: Vec<ItemId> = feed.visible().iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn search_is_case_sensitive_and_reclamps_cursor() {
        let mut feed = Feed::new(vec![
            item(1, "Dance", 0),
            item(2, "dance off", 0),
            item(3, "Squat", 0),
        ]);
        feed.advance(Direction::Forward);
        feed.advance(Direction::Forward);
        feed.set_search("Dance");
        assert_eq!(feed.visible_len(), 1);
        assert_eq!(feed.cursor(), Some(0));
        assert_eq!(feed.focused_id(), Some(1));

        feed.set_search("nothing");
        assert_eq!(feed.cursor(), None);
    }

    #[test]
    fn like_targets_focused_item_in_filtered_view() {
        let mut feed = Feed::new(vec![item(1, "cat", 0), item(2, "dog", 5)]);
        feed.set_search("dog");
        assert_eq!(feed.like(), Some(6));
        assert_eq!(feed.items()[0].like_num, 0);
    }

    #[test]
    fn reset_interaction_clears_every_flag() {
        let mut feed = Feed::new(vec![item(1, "a", 0)]);
        feed.like();
        feed.toggle_comments();
        feed.toggle_confirmation();
        feed.reset_interaction();
        assert_eq!(feed.interaction(), Interaction::default());
        assert_eq!(feed.items()[0].like_num, 1);
    }

    #[test]
    fn advance_refused_while_comments_open() {
        let mut feed = Feed::new(vec![item(1, "a", 0), item(2, "b", 0)]);
        assert!(feed.toggle_comments());
        assert!(!feed.advance(Direction::Forward));
        assert_eq!(feed.cursor(), Some(0));
        assert!(feed.interaction().comment_open);
    }

    #[test]
    fn remove_steps_cursor_back_with_floor() {
        let mut feed = Feed::new(vec![item(1, "a", 0), item(2, "b", 0), item(3, "c", 0)]);
        feed.advance(Direction::Forward);
        feed.toggle_confirmation();
        assert!(feed.remove_item(2));
        assert_eq!(feed.cursor(), Some(0));
        assert!(!feed.interaction().show_confirmation);

        assert!(feed.remove_item(1));
        assert_eq!(feed.cursor(), Some(0));
        assert_eq!(feed.focused_id(), Some(3));
        assert!(!feed.remove_item(99));
    }

    #[test]
    fn up_next_skips_items_without_video() {
        let mut second = item(2, "b", 0);
        second.video_url = String::new();
        let mut feed = Feed::new(vec![item(1, "a", 0), second, item(3, "c", 0)]);
        assert!(feed.up_next().is_none());
        feed.advance(Direction::Forward);
        assert_eq!(feed.up_next().map(|item| item.id), Some(3));
        feed.advance(Direction::Forward);
        assert!(feed.up_next().is_none());
    }

    #[test]
    fn comment_cache_follows_item() {
        let mut feed = Feed::new(vec![item(1, "a", 0), item(2, "b", 0)]);
        feed.begin_comments(1);
        feed.set_comments(
            1,
            vec![Comment {
                id: 1,
                nickname: "mina".into(),
                text: "hi".into(),
            }],
        );
        assert_eq!(feed.comment_count(), 1);
        feed.advance(Direction::Forward);
        assert_eq!(feed.comment_count(), 0);
        feed.begin_comments(2);
        assert!(feed.comments().is_empty());
        assert_eq!(feed.comments_for(), Some(2));
    }

    #[test]
    fn draft_validation_trims() {
        assert!(!is_submittable("  ", "text"));
        assert!(!is_submittable("nick", "\t\n"));
        assert!(is_submittable(" nick ", " text "));
        let mut draft = CommentDraft {
            nickname: "n".into(),
            text: "t".into(),
        };
        assert!(draft.is_submittable());
        draft.clear();
        assert_eq!(draft, CommentDraft::default());
    }

    #[test]
    fn wheel_delta_sign_maps_to_direction() {
        assert_eq!(Direction::from_delta(120), Some(Direction::Forward));
        assert_eq!(Direction::from_delta(-3), Some(Direction::Backward));
        assert_eq!(Direction::from_delta(0), None);
    }
}
