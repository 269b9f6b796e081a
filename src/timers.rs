//! Deferred actions keyed on the logical clock. Owners poll `take_due` from their
//! own update step, so clearing the list on dispose cancels everything still pending.

#[derive(Clone, Debug)]
pub struct Timers<K> {
    pending: Vec<(u64, K)>,
}

impl<K> Default for Timers<K> {
    fn default() -> Self {
        Self { pending: Vec::new() }
    }
}

impl<K: PartialEq> Timers<K> {
    pub fn schedule(&mut self, due_at: u64, key: K) {
        self.pending.push((due_at, key));
    }

    /// Drops every pending entry equal to `key`.
    pub fn cancel(&mut self, key: &K) {
        self.pending.retain(|(_, k)| k != key);
    }

    /// Removes and returns entries due at or before `now`, earliest first.
    pub fn take_due(&mut self, now: u64) -> Vec<K> {
        if !self.pending.iter().any(|(due, _)| *due <= now) {
            return Vec::new();
        }
        let (mut due, rest): (Vec<_>, Vec<_>) = self.pending.drain(..).partition(|(at, _)| *at <= now);
        self.pending = rest;
        due.sort_by_key(|(at, _)| *at);
        due.into_iter().map(|(_, k)| k).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
