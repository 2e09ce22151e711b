use std::collections::HashMap;
use std::hash::Hash;

/// Slots of a latest-value join. `combine` runs after every slot write and sees the most
/// recent value of every slot, whichever slot changed.
pub trait Join<K>: Default {
    type Output;

    fn combine(&self, key: &K) -> Option<Self::Output>;
}

/// One join instance per key, created on first write.
pub struct JoinArena<K, J> {
    joins: HashMap<K, J>,
}

impl<K, J> Default for JoinArena<K, J> {
    fn default() -> Self {
        Self { joins: HashMap::new() }
    }
}

impl<K, J> JoinArena<K, J>
where
    K: Clone + Eq + Hash,
    J: Join<K>,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes into the slots of `key` and recomputes the join body.
    pub fn write(&mut self, key: &K, write: impl FnOnce(&mut J)) -> Option<J::Output> {
        let join = self.joins.entry(key.clone()).or_default();
        write(join);
        join.combine(key)
    }

    /// Writes into the slots of `key` without recomputing, for joins read later through [`combine`].
    ///
    /// [`combine`]: JoinArena::combine
    pub fn update(&mut self, key: &K, write: impl FnOnce(&mut J)) {
        write(self.joins.entry(key.clone()).or_default());
    }

    /// Recomputes the join body of `key` from the slots as they are.
    pub fn combine(&self, key: &K) -> Option<J::Output> {
        self.joins.get(key).and_then(|join| join.combine(key))
    }

    pub fn get(&self, key: &K) -> Option<&J> {
        self.joins.get(key)
    }
}
