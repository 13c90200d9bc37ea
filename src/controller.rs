use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::api::{Comment, FeedItem, ItemId};
use crate::data::{CommentService, FeedService, ModerationService};
use crate::feed::{self, CommentDraft, Direction, Feed};

#[derive(Clone)]
pub struct Services {
    pub feed: Arc<dyn FeedService + Send + Sync>,
    pub comments: Arc<dyn CommentService + Send + Sync>,
    pub moderation: Arc<dyn ModerationService + Send + Sync>,
}

enum ApiResponse {
    Feed {
        request_id: u64,
        result: Result<Vec<FeedItem>>,
    },
    Comments {
        request_id: u64,
        item: ItemId,
        result: Result<Vec<Comment>>,
    },
    CommentPosted {
        request_id: u64,
        item: ItemId,
        result: Result<Comment>,
    },
    Deleted {
        request_id: u64,
        item: ItemId,
        result: Result<()>,
    },
}

struct PendingRequest {
    request_id: u64,
    item: ItemId,
}

// Calls run on worker threads and are applied by `poll` on the owning
// thread. Each category keeps the id of its latest request; older responses
// are dropped on arrival.
pub struct Controller {
    feed: Feed,
    draft: CommentDraft,
    services: Services,
    response_tx: Sender<ApiResponse>,
    response_rx: Receiver<ApiResponse>,
    next_request_id: u64,
    pending_feed: Option<u64>,
    pending_comments: Option<PendingRequest>,
    pending_submit: Option<PendingRequest>,
    pending_delete: Option<PendingRequest>,
    last_focus: Option<ItemId>,
    last_error: Option<String>,
}

impl Controller {
    pub fn new(services: Services) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            feed: Feed::default(),
            draft: CommentDraft::default(),
            services,
            response_tx,
            response_rx,
            next_request_id: 1,
            pending_feed: None,
            pending_comments: None,
            pending_submit: None,
            pending_delete: None,
            last_focus: None,
            last_error: None,
        }
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    pub fn draft(&self) -> &CommentDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut CommentDraft {
        &mut self.draft
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending_feed.is_some()
            || self.pending_comments.is_some()
            || self.pending_submit.is_some()
            || self.pending_delete.is_some()
    }

    pub fn is_loading_comments(&self) -> bool {
        self.pending_comments.is_some()
    }

    pub fn up_next(&self) -> Option<&FeedItem> {
        self.feed.up_next()
    }

    pub fn load_feed(&mut self) {
        let request_id = self.allocate_request_id();
        self.pending_feed = Some(request_id);
        debug!(request_id, "loading feed");

        let tx = self.response_tx.clone();
        let service = Arc::clone(&self.services.feed);
        thread::spawn(move || {
            let result = service.load_feed();
            let _ = tx.send(ApiResponse::Feed { request_id, result });
        });
    }

    pub fn load_comments(&mut self, item: ItemId) {
        let request_id = self.allocate_request_id();
        self.pending_comments = Some(PendingRequest { request_id, item });
        self.feed.begin_comments(item);
        debug!(request_id, item, "loading comments");

        let tx = self.response_tx.clone();
        let service = Arc::clone(&self.services.comments);
        thread::spawn(move || {
            let result = service.load_comments(item);
            let _ = tx.send(ApiResponse::Comments {
                request_id,
                item,
                result,
            });
        });
    }

    pub fn advance(&mut self, direction: Direction) -> bool {
        if !self.feed.advance(direction) {
            return false;
        }
        self.sync_focus();
        true
    }

    pub fn like(&mut self) -> Option<i64> {
        let likes = self.feed.like()?;
        debug!(item = ?self.feed.focused_id(), likes, "liked locally");
        Some(likes)
    }

    pub fn toggle_comments(&mut self) -> bool {
        self.feed.toggle_comments()
    }

    pub fn toggle_confirmation(&mut self) -> bool {
        self.feed.toggle_confirmation()
    }

    pub fn filter(&mut self, search_text: impl Into<String>) {
        self.feed.set_search(search_text);
        self.sync_focus();
    }

    pub fn submit_comment(&mut self, nickname: &str, text: &str) -> bool {
        if !feed::is_submittable(nickname, text) {
            return false;
        }
        if self.pending_submit.is_some() {
            debug!("comment submission already in flight");
            return false;
        }
        let Some(item) = self.feed.focused_id() else {
            return false;
        };

        let request_id = self.allocate_request_id();
        self.pending_submit = Some(PendingRequest { request_id, item });
        debug!(request_id, item, "posting comment");

        let tx = self.response_tx.clone();
        let service = Arc::clone(&self.services.comments);
        let nickname = nickname.to_string();
        let text = text.to_string();
        thread::spawn(move || {
            let result = service.post_comment(item, &nickname, &text);
            let _ = tx.send(ApiResponse::CommentPosted {
                request_id,
                item,
                result,
            });
        });
        true
    }

    pub fn submit_draft(&mut self) -> bool {
        let CommentDraft { nickname, text } = self.draft.clone();
        self.submit_comment(&nickname, &text)
    }

    pub fn delete_item(&mut self, password: &str) -> bool {
        if self.pending_delete.is_some() {
            debug!("delete already in flight");
            return false;
        }
        let Some(item) = self.feed.focused_id() else {
            return false;
        };

        let request_id = self.allocate_request_id();
        self.pending_delete = Some(PendingRequest { request_id, item });
        debug!(request_id, item, "requesting delete");

        let tx = self.response_tx.clone();
        let service = Arc::clone(&self.services.moderation);
        let password = password.to_string();
        thread::spawn(move || {
            let result = service.delete_item(item, &password);
            let _ = tx.send(ApiResponse::Deleted {
                request_id,
                item,
                result,
            });
        });
        true
    }

    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_response(message);
            changed = true;
        }
        changed
    }

    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_loading() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.response_rx.recv_timeout(remaining) {
                Ok(message) => self.handle_response(message),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        true
    }

    fn handle_response(&mut self, message: ApiResponse) {
        match message {
            ApiResponse::Feed { request_id, result } => {
                if self.pending_feed != Some(request_id) {
                    debug!(request_id, "discarding superseded feed response");
                    return;
                }
                self.pending_feed = None;
                match result {
                    Ok(items) => {
                        info!(count = items.len(), "feed loaded");
                        self.feed.replace_items(items);
                        self.sync_focus();
                    }
                    Err(err) => self.record_error("Error fetching challenges", &err),
                }
            }
            ApiResponse::Comments {
                request_id,
                item,
                result,
            } => {
                let current = matches!(
                    &self.pending_comments,
                    Some(pending) if pending.request_id == request_id && pending.item == item
                );
                if !current {
                    debug!(request_id, item, "discarding stale comments response");
                    return;
                }
                self.pending_comments = None;
                if self.feed.focused_id() != Some(item) {
                    debug!(item, "focus moved before comments arrived");
                    return;
                }
                match result {
                    Ok(comments) => {
                        debug!(item, count = comments.len(), "comments loaded");
                        self.feed.set_comments(item, comments);
                    }
                    Err(err) => self.record_error("Error fetching comments", &err),
                }
            }
            ApiResponse::CommentPosted {
                request_id,
                item,
                result,
            } => {
                if !matches!(&self.pending_submit, Some(pending) if pending.request_id == request_id)
                {
                    return;
                }
                self.pending_submit = None;
                match result {
                    Ok(comment) => {
                        info!(item, comment = comment.id, "comment added");
                        self.feed.append_comment(item, comment);
                        self.draft.clear();
                    }
                    Err(err) => self.record_error("Error adding comment", &err),
                }
            }
            ApiResponse::Deleted {
                request_id,
                item,
                result,
            } => {
                if !matches!(&self.pending_delete, Some(pending) if pending.request_id == request_id)
                {
                    return;
                }
                self.pending_delete = None;
                match result {
                    Ok(()) => {
                        info!(item, "video deleted");
                        self.feed.remove_item(item);
                        self.sync_focus();
                    }
                    Err(err) => self.record_error("Error deleting video", &err),
                }
            }
        }
    }

    fn sync_focus(&mut self) {
        let focus = self.feed.focused_id();
        if focus == self.last_focus {
            return;
        }
        self.last_focus = focus;
        self.feed.reset_interaction();
        match focus {
            Some(item) => self.load_comments(item),
            None => self.pending_comments = None,
        }
    }

    fn record_error(&mut self, what: &str, err: &anyhow::Error) {
        warn!("{what}: {err:#}");
        self.last_error = Some(format!("{what}: {err:#}"));
    }

    fn allocate_request_id(&mut self) -> u64 {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        request_id
    }
}
