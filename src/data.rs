use anyhow::{Context, Result};
use std::sync::Arc;

use crate::api::{self, Comment, FeedItem, ItemId};

pub trait FeedService: Send + Sync {
    fn load_feed(&self) -> Result<Vec<FeedItem>>;
}

pub trait CommentService: Send + Sync {
    fn load_comments(&self, item: ItemId) -> Result<Vec<Comment>>;
    fn post_comment(&self, item: ItemId, nickname: &str, text: &str) -> Result<Comment>;
}

pub trait ModerationService: Send + Sync {
    fn delete_item(&self, item: ItemId, password: &str) -> Result<()>;
}

pub struct ApiFeedService {
    client: Arc<api::Client>,
}

impl ApiFeedService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl FeedService for ApiFeedService {
    fn load_feed(&self) -> Result<Vec<FeedItem>> {
        self.client.challenges().context("fetch challenges")
    }
}

pub struct ApiCommentService {
    client: Arc<api::Client>,
}

impl ApiCommentService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl CommentService for ApiCommentService {
    fn load_comments(&self, item: ItemId) -> Result<Vec<Comment>> {
        self.client.comments(item).context("fetch comments")
    }

    fn post_comment(&self, item: ItemId, nickname: &str, text: &str) -> Result<Comment> {
        self.client
            .post_comment(item, nickname, text)
            .context("add comment")
    }
}

pub struct ApiModerationService {
    client: Arc<api::Client>,
}

impl ApiModerationService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl ModerationService for ApiModerationService {
    fn delete_item(&self, item: ItemId, password: &str) -> Result<()> {
        self.client
            .delete_challenge(item, password)
            .context("delete video")
    }
}
