use std::collections::{HashSet, VecDeque};

use crate::domain::PostId;

/// Bounded window of recently relayed posts.
///
/// Random picks repeat every now and then; this keeps the channel from
/// showing the same post twice within the window. Oldest ids are evicted first.
#[derive(Clone, Debug)]
pub struct RecentPosts {
    capacity: usize,
    order: VecDeque<PostId>,
    seen: HashSet<PostId>,
}

impl RecentPosts {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity.min(4096)),
            seen: HashSet::new(),
        }
    }

    pub fn contains(&self, id: PostId) -> bool {
        self.seen.contains(&id)
    }

    /// Remember `id`. Returns false if it was already tracked (or tracking is off).
    pub fn insert(&mut self, id: PostId) -> bool {
        if self.capacity == 0 || self.seen.contains(&id) {
            return false;
        }

        while self.order.len() >= self.capacity {
            let Some(old) = self.order.pop_front() else {
                break;
            };
            self.seen.remove(&old);
        }

        self.order.push_back(id);
        self.seen.insert(id);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
