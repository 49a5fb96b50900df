//! Bounded in-memory store of recently seen posts.
//!
//! Strict FIFO: at capacity, the oldest post is evicted before appending.
//! Owned by the dispatcher and never shared, so no mutex.

use std::collections::VecDeque;

use crate::post::Post;

pub const DEFAULT_HISTORY_CAPACITY: usize = 10_000;

#[derive(Debug)]
pub struct PostHistory {
    posts: VecDeque<Post>,
    cap: usize,
}

impl PostHistory {
    /// A capacity of 0 is treated as 1.
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            posts: VecDeque::with_capacity(cap.min(DEFAULT_HISTORY_CAPACITY)),
            cap,
        }
    }

    /// Current contents, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &Post> + '_ {
        self.posts.iter()
    }

    pub fn add(&mut self, post: Post) {
        while self.posts.len() >= self.cap {
            self.posts.pop_front();
        }
        self.posts.push_back(post);
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }
}

impl Default for PostHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}
