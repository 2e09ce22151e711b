use std::collections::HashMap;
use std::hash::Hash;

use tokio::sync::mpsc;

/// Per-key latest-value cache that multicasts forwarded values and replays the cache to late
/// subscribers.
///
/// The owning component is the only writer. Every key is an independent partition: a value for
/// one key never affects what is cached or forwarded for another.
pub struct KeyedReplay<K, V> {
    name: &'static str,
    key_of: fn(&V) -> K,
    equals: Option<fn(&V, &V) -> bool>,
    latest: HashMap<K, V>,
    order: Vec<K>,
    subscribers: Vec<mpsc::UnboundedSender<V>>,
}

/// Receiving end of a [`KeyedReplay`]. Starts with the replayed cache, then live values.
pub struct Subscription<V> {
    rx: mpsc::UnboundedReceiver<V>,
}

impl<K, V> KeyedReplay<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone + PartialEq,
{
    /// Suppresses repeats that are structurally equal to the cached value.
    pub fn distinct(name: &'static str, key_of: fn(&V) -> K) -> Self {
        Self::new(name, key_of, Some(structurally_equal::<V> as fn(&V, &V) -> bool))
    }
}

impl<K, V> KeyedReplay<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Suppresses repeats for which `equals(cached, new)` holds.
    pub fn with_equality(name: &'static str, key_of: fn(&V) -> K, equals: fn(&V, &V) -> bool) -> Self {
        Self::new(name, key_of, Some(equals))
    }

    /// Forwards and caches every value, repeats included.
    pub fn by_key(name: &'static str, key_of: fn(&V) -> K) -> Self {
        Self::new(name, key_of, None)
    }

    fn new(name: &'static str, key_of: fn(&V) -> K, equals: Option<fn(&V, &V) -> bool>) -> Self {
        Self {
            name,
            key_of,
            equals,
            latest: HashMap::new(),
            order: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    /// Offers a value to its key's partition. Returns `true` if it was forwarded.
    pub fn push(&mut self, value: V) -> bool {
        let key = (self.key_of)(&value);

        match self.latest.get(&key) {
            Some(cached) if self.equals.is_some_and(|equals| equals(cached, &value)) => return false,
            Some(_) => {}
            None => self.order.push(key.clone()),
        }

        self.latest.insert(key, value.clone());
        self.forward(value);

        true
    }

    pub fn subscribe(&mut self) -> Subscription<V> {
        let (tx, rx) = mpsc::unbounded_channel();

        for key in &self.order {
            if let Some(value) = self.latest.get(key) {
                //receiver is alive, it is returned below
                let _ = tx.send(value.clone());
            }
        }

        self.subscribers.push(tx);
        Subscription { rx }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.latest.get(key)
    }

    /// Cached values in first-seen key order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.order.iter().filter_map(|key| self.latest.get(key))
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }

    fn forward(&mut self, value: V) {
        let before = self.subscribers.len();
        self.subscribers.retain(|tx| tx.send(value.clone()).is_ok());

        let dropped = before - self.subscribers.len();
        if dropped > 0 {
            tracing::debug!("Removed {} closed subscriptions of {}", dropped, self.name);
        }
    }
}

fn structurally_equal<V: PartialEq>(a: &V, b: &V) -> bool {
    a == b
}

impl<V> Subscription<V> {
    pub async fn recv(&mut self) -> Option<V> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<V> {
        self.rx.try_recv().ok()
    }

    /// Everything that is currently buffered, without waiting.
    pub fn drain(&mut self) -> Vec<V> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Reading {
        key: &'static str,
        value: i32,
    }

    fn reading(key: &'static str, value: i32) -> Reading {
        Reading { key, value }
    }

    fn key_of(reading: &Reading) -> &'static str {
        reading.key
    }

    #[test]
    fn late_subscriber_gets_latest_per_key() {
        let mut replay = KeyedReplay::distinct("readings", key_of);

        let forwarded: Vec<bool> = vec![reading("A", 1), reading("B", 2), reading("A", 1), reading("C", 3)]
            .into_iter()
            .map(|r| replay.push(r))
            .collect();

        assert_eq!(forwarded, vec![true, true, false, true]);

        let mut late = replay.subscribe();
        assert_eq!(late.drain(), vec![reading("A", 1), reading("B", 2), reading("C", 3)]);
    }

    #[test]
    fn changed_value_replaces_cache_and_is_forwarded() {
        let mut replay = KeyedReplay::distinct("readings", key_of);
        let mut early = replay.subscribe();

        replay.push(reading("A", 1));
        replay.push(reading("A", 2));
        replay.push(reading("A", 2));

        assert_eq!(early.drain(), vec![reading("A", 1), reading("A", 2)]);
        assert_eq!(replay.get(&"A"), Some(&reading("A", 2)));
        assert_eq!(replay.subscribe().drain(), vec![reading("A", 2)]);
    }

    #[test]
    fn replay_then_live_values() {
        let mut replay = KeyedReplay::distinct("readings", key_of);
        replay.push(reading("A", 1));

        let mut subscription = replay.subscribe();
        replay.push(reading("B", 5));

        assert_eq!(subscription.drain(), vec![reading("A", 1), reading("B", 5)]);
    }

    #[test]
    fn by_key_forwards_repeats() {
        let mut replay = KeyedReplay::by_key("readings", key_of);
        let mut subscription = replay.subscribe();

        assert!(replay.push(reading("A", 1)));
        assert!(replay.push(reading("A", 1)));

        assert_eq!(subscription.drain().len(), 2);
        assert_eq!(replay.len(), 1);
    }

    #[test]
    fn custom_equality_decides_suppression() {
        let mut replay = KeyedReplay::with_equality("readings", key_of, |a: &Reading, b: &Reading| {
            (a.value - b.value).abs() < 2
        });

        assert!(replay.push(reading("A", 10)));
        assert!(!replay.push(reading("A", 11)));
        assert!(replay.push(reading("A", 13)));

        assert_eq!(replay.get(&"A"), Some(&reading("A", 13)));
    }

    #[test]
    fn closed_subscriptions_are_pruned() {
        let mut replay = KeyedReplay::distinct("readings", key_of);
        let dropped = replay.subscribe();
        let mut kept = replay.subscribe();
        drop(dropped);

        replay.push(reading("A", 1));

        assert_eq!(replay.subscribers.len(), 1);
        assert_eq!(kept.drain(), vec![reading("A", 1)]);
    }
}
