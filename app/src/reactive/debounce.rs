use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio_util::time::{DelayQueue, delay_queue};

/// Per-key trailing debounce: a value is released once its key has been quiet for the whole
/// window. Newer values for a pending key replace the older one and restart the window.
pub struct Debouncer<K, V> {
    quiet: Duration,
    queue: DelayQueue<K>,
    pending: HashMap<K, (delay_queue::Key, V)>,
}

impl<K, V> Debouncer<K, V>
where
    K: Clone + Eq + Hash,
{
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            queue: DelayQueue::new(),
            pending: HashMap::new(),
        }
    }

    pub fn push(&mut self, key: K, value: V) {
        match self.pending.get_mut(&key) {
            Some((delay_key, pending)) => {
                self.queue.reset(delay_key, self.quiet);
                *pending = value;
            }
            None => {
                let delay_key = self.queue.insert(key.clone(), self.quiet);
                self.pending.insert(key, (delay_key, value));
            }
        }
    }

    /// Next value whose quiet window elapsed. Resolves to `None` right away if nothing is pending.
    pub async fn next(&mut self) -> Option<V> {
        let expired = std::future::poll_fn(|cx| self.queue.poll_expired(cx)).await?;

        self.pending.remove(expired.get_ref()).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
