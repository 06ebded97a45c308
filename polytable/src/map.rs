//! Index map backings and the capability contract they satisfy.
//!
//! Every index, primary included, is a map from a sub-key to small values:
//! the primary stores arena slots (`usize`), secondaries store whatever
//! reference token the active policy picked. [`SecondaryMap`] is the whole
//! contract; the built-ins hash with `ahash`, and anything else that
//! implements the trait (ordered, custom) plugs in the same way.

use core::hash::Hash;
use core::slice;

use ahash::AHashMap;
use std::collections::hash_map;

/// Capability contract for an index backing.
///
/// `get_all` is the equal-range primitive everything else is built from: a
/// unique map yields a range of at most one. Entry removal and patching
/// identify the exact entry by value equality, which is enough because every
/// stored record owns exactly one reference token per index.
pub trait SecondaryMap<K, V: PartialEq>: Default {
    /// Whether this map rejects a second entry under an existing key.
    const UNIQUE: bool;

    type Iter<'a>: Iterator<Item = (&'a K, &'a V)>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    /// Adds an entry. Returns false when a unique map already holds the key;
    /// multi maps always accept.
    fn insert(&mut self, key: K, value: V) -> bool;

    /// Removes the entry under `key` whose value equals `value`.
    fn remove(&mut self, key: &K, value: &V) -> bool;

    /// Rewrites every entry under `key` whose value equals `old` to `new`.
    fn patch(&mut self, key: &K, old: &V, new: &V)
    where
        V: Clone;

    /// All values stored under `key`, in insertion order.
    fn get_all(&self, key: &K) -> &[V];

    #[inline]
    fn first(&self, key: &K) -> Option<&V> {
        self.get_all(key).first()
    }

    #[inline]
    fn count(&self, key: &K) -> usize {
        self.get_all(key).len()
    }

    #[inline]
    fn contains_key(&self, key: &K) -> bool {
        !self.get_all(key).is_empty()
    }

    /// Total number of entries.
    fn len(&self) -> usize;

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);

    fn reserve(&mut self, additional: usize);

    fn iter(&self) -> Self::Iter<'_>;
}

/// Marker for maps that hold at most one entry per key. Operations that only
/// make sense on a unique primary (`edit`, `insert_or_replace`) are gated on
/// it at compile time.
pub trait UniqueIndex {}

/// Unique hashed backing: one value per key.
#[derive(Clone, Debug)]
pub struct UniqueHashMap<K, V>(AHashMap<K, V>);

impl<K, V> Default for UniqueHashMap<K, V> {
    #[inline]
    fn default() -> Self {
        UniqueHashMap(AHashMap::new())
    }
}

impl<K, V> UniqueIndex for UniqueHashMap<K, V> {}

impl<K: Hash + Eq, V: PartialEq> SecondaryMap<K, V> for UniqueHashMap<K, V> {
    const UNIQUE: bool = true;

    type Iter<'a>
        = hash_map::Iter<'a, K, V>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    fn insert(&mut self, key: K, value: V) -> bool {
        match self.0.entry(key) {
            hash_map::Entry::Occupied(_) => false,
            hash_map::Entry::Vacant(vacant) => {
                vacant.insert(value);
                true
            }
        }
    }

    fn remove(&mut self, key: &K, value: &V) -> bool {
        match self.0.get(key) {
            Some(stored) if stored == value => {
                self.0.remove(key);
                true
            }
            _ => false,
        }
    }

    fn patch(&mut self, key: &K, old: &V, new: &V)
    where
        V: Clone,
    {
        if let Some(stored) = self.0.get_mut(key) {
            if stored == old {
                *stored = new.clone();
            }
        }
    }

    #[inline]
    fn get_all(&self, key: &K) -> &[V] {
        self.0.get(key).map(slice::from_ref).unwrap_or(&[])
    }

    #[inline]
    fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    fn clear(&mut self) {
        self.0.clear();
    }

    #[inline]
    fn reserve(&mut self, additional: usize) {
        self.0.reserve(additional);
    }

    #[inline]
    fn iter(&self) -> Self::Iter<'_> {
        self.0.iter()
    }
}

/// Multi hashed backing: entries under one key keep insertion order.
#[derive(Clone, Debug)]
pub struct MultiHashMap<K, V> {
    map: AHashMap<K, Vec<V>>,
    entries: usize,
}

impl<K, V> Default for MultiHashMap<K, V> {
    #[inline]
    fn default() -> Self {
        MultiHashMap {
            map: AHashMap::new(),
            entries: 0,
        }
    }
}

impl<K: Hash + Eq, V: PartialEq> SecondaryMap<K, V> for MultiHashMap<K, V> {
    const UNIQUE: bool = false;

    type Iter<'a>
        = MultiIter<'a, K, V>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    fn insert(&mut self, key: K, value: V) -> bool {
        self.map.entry(key).or_default().push(value);
        self.entries += 1;
        true
    }

    fn remove(&mut self, key: &K, value: &V) -> bool {
        let Some(values) = self.map.get_mut(key) else {
            return false;
        };
        let Some(position) = values.iter().position(|stored| stored == value) else {
            return false;
        };
        values.remove(position);
        if values.is_empty() {
            self.map.remove(key);
        }
        self.entries -= 1;
        true
    }

    fn patch(&mut self, key: &K, old: &V, new: &V)
    where
        V: Clone,
    {
        if let Some(values) = self.map.get_mut(key) {
            for stored in values.iter_mut() {
                if stored == old {
                    *stored = new.clone();
                }
            }
        }
    }

    #[inline]
    fn get_all(&self, key: &K) -> &[V] {
        self.map.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    #[inline]
    fn len(&self) -> usize {
        self.entries
    }

    fn clear(&mut self) {
        self.map.clear();
        self.entries = 0;
    }

    #[inline]
    fn reserve(&mut self, additional: usize) {
        self.map.reserve(additional);
    }

    #[inline]
    fn iter(&self) -> Self::Iter<'_> {
        MultiIter {
            outer: self.map.iter(),
            current: None,
        }
    }
}

/// Flattening iterator over a [`MultiHashMap`], yielding each (key, value)
/// entry once.
pub struct MultiIter<'a, K, V> {
    outer: hash_map::Iter<'a, K, Vec<V>>,
    current: Option<(&'a K, slice::Iter<'a, V>)>,
}

impl<'a, K, V> Iterator for MultiIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((key, values)) = &mut self.current {
                if let Some(value) = values.next() {
                    return Some((key, value));
                }
            }
            let (key, values) = self.outer.next()?;
            self.current = Some((key, values.iter()));
        }
    }
}
