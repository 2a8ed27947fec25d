use std::collections::{BTreeMap, BTreeSet};

/// A map from a key to a set of values, with insertion order within a key preserved.
#[derive(Clone)]
pub struct MultiMap<K, V>
where
    K: Ord + PartialEq + Clone,
    V: Ord + PartialEq + Clone,
{
    map: BTreeMap<K, Vec<V>>,
    empty: Vec<V>,
}

impl<K, V> MultiMap<K, V>
where
    K: Ord + PartialEq + Clone,
    V: Ord + PartialEq + Clone,
{
    pub fn new() -> MultiMap<K, V> {
        MultiMap {
            map: BTreeMap::new(),
            empty: Vec::new(),
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.map.entry(key).or_insert_with(Vec::new).push(value);
    }

    pub fn get(&self, key: &K) -> &Vec<V> {
        self.map.get(key).unwrap_or(&self.empty)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn borrow(&self) -> &BTreeMap<K, Vec<V>> {
        &self.map
    }

    pub fn consume(self) -> BTreeMap<K, Vec<V>> {
        self.map
    }
}

impl<K, V> Default for MultiMap<K, V>
where
    K: Ord + PartialEq + Clone,
    V: Ord + PartialEq + Clone,
{
    fn default() -> MultiMap<K, V> {
        MultiMap::new()
    }
}

/// Counts instances of each key.
#[derive(Clone)]
pub struct Counter<T: Ord + PartialEq + Clone> {
    map: BTreeMap<T, usize>,
    sum: usize,
}

impl<T: Ord + PartialEq + Clone> Default for Counter<T> {
    fn default() -> Counter<T> {
        Counter::new()
    }
}

impl<T: Ord + PartialEq + Clone> Counter<T> {
    pub fn new() -> Counter<T> {
        Counter {
            map: BTreeMap::new(),
            sum: 0,
        }
    }

    pub fn add(&mut self, val: T, amount: usize) -> usize {
        let entry = self.map.entry(val).or_insert(0);
        *entry += amount;
        self.sum += amount;
        *entry
    }

    pub fn inc(&mut self, val: T) -> usize {
        self.add(val, 1)
    }

    pub fn get(&self, val: T) -> usize {
        self.map.get(&val).cloned().unwrap_or(0)
    }

    /// All the keys reaching the highest count. Ties are returned in key order.
    pub fn max_keys(&self) -> Vec<T> {
        let max = match self.map.values().max() {
            Some(x) => *x,
            None => {
                return Vec::new();
            }
        };
        self.map
            .iter()
            .filter(|(_, cnt)| **cnt == max)
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn sum(&self) -> usize {
        self.sum
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn borrow(&self) -> &BTreeMap<T, usize> {
        &self.map
    }

    pub fn consume(self) -> BTreeMap<T, usize> {
        self.map
    }

    pub fn keys(&self) -> Vec<T> {
        self.map.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_max_keys_breaks_nothing_on_empty() {
        let c: Counter<String> = Counter::new();
        assert!(c.max_keys().is_empty());
    }

    #[test]
    fn counter_max_keys_returns_all_tied() {
        let mut c = Counter::new();
        c.add("a", 2);
        c.add("b", 2);
        c.inc("c");
        assert_eq!(c.max_keys(), vec!["a", "b"]);
        assert_eq!(c.sum(), 5);
    }
}
