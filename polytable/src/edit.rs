//! Scoped edit proxy for unique-primary tables.
//!
//! `table.edit(key)` buffers a copy of the record (or a default payload for
//! a new key) and hands it out for in-place mutation. Committing performs an
//! insert, replace, or revival through the table core; dropping the proxy
//! without an explicit `commit` commits implicitly and records the outcome
//! in the container's status flag. Prefer the boolean from `commit`; the
//! flag is a diagnostic channel.

use core::hash::Hash;
use core::ops::{Deref, DerefMut};

use crate::arena::Arena;
use crate::handle::Handle;
use crate::map::{SecondaryMap, UniqueIndex};
use crate::policy::{Policy, SupportsPrimary};
use crate::secondaries::Secondaries;
use crate::status::StatusFlag;
use crate::table::MultiIndex;

/// A buffered edit of one keyed record. Commit-or-abort on every exit path.
pub struct Edit<'a, K, V, P, PM, S, F>
where
    K: Clone + Hash + Eq,
    V: Clone + PartialEq,
    P: Policy<K> + SupportsPrimary<PM>,
    PM: SecondaryMap<K, usize> + UniqueIndex,
    S: Secondaries<K, V, P::Ref>,
    F: StatusFlag,
{
    table: &'a mut MultiIndex<K, V, P, PM, S, F>,
    handle: Handle,
    key: K,
    buf: V,
    committed: bool,
}

impl<K, V, P, PM, S, F> MultiIndex<K, V, P, PM, S, F>
where
    K: Clone + Hash + Eq,
    V: Clone,
    P: Policy<K> + SupportsPrimary<PM>,
    PM: SecondaryMap<K, usize>,
    S: Secondaries<K, V, P::Ref>,
    F: StatusFlag,
{
    /// Opens a buffered edit of the record under `key`. A dead record is
    /// editable (committing revives it); an absent key starts from the
    /// default payload and committing inserts it.
    pub fn edit(&mut self, key: K) -> Edit<'_, K, V, P, PM, S, F>
    where
        PM: UniqueIndex,
        V: Default + PartialEq,
    {
        match self.primary.first(&key).copied() {
            Some(slot) => {
                let buf = self.arena.get(slot).expect("indexed slot").payload.clone();
                Edit {
                    table: self,
                    handle: Handle::new(slot),
                    key,
                    buf,
                    committed: false,
                }
            }
            None => Edit {
                table: self,
                handle: Handle::null(),
                key,
                buf: V::default(),
                committed: false,
            },
        }
    }
}

impl<K, V, P, PM, S, F> Edit<'_, K, V, P, PM, S, F>
where
    K: Clone + Hash + Eq,
    V: Clone + PartialEq,
    P: Policy<K> + SupportsPrimary<PM>,
    PM: SecondaryMap<K, usize> + UniqueIndex,
    S: Secondaries<K, V, P::Ref>,
    F: StatusFlag,
{
    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Applies the buffered payload. Returns false when a unique secondary
    /// rejected it; the table is unchanged in that case.
    pub fn commit(mut self) -> bool {
        self.committed = true;
        self.apply()
    }

    /// Discards the buffered payload without touching the table.
    pub fn abort(mut self) {
        self.committed = true;
    }

    fn apply(&mut self) -> bool {
        let ok = if self.handle.is_null() {
            self.table.emplace(self.key.clone(), self.buf.clone()).1
        } else {
            // Replace revives a dead record and short-circuits an equal
            // live one.
            self.table.replace(self.handle, self.buf.clone())
        };
        F::set(ok);
        ok
    }
}

impl<K, V, P, PM, S, F> Deref for Edit<'_, K, V, P, PM, S, F>
where
    K: Clone + Hash + Eq,
    V: Clone + PartialEq,
    P: Policy<K> + SupportsPrimary<PM>,
    PM: SecondaryMap<K, usize> + UniqueIndex,
    S: Secondaries<K, V, P::Ref>,
    F: StatusFlag,
{
    type Target = V;

    #[inline]
    fn deref(&self) -> &V {
        &self.buf
    }
}

impl<K, V, P, PM, S, F> DerefMut for Edit<'_, K, V, P, PM, S, F>
where
    K: Clone + Hash + Eq,
    V: Clone + PartialEq,
    P: Policy<K> + SupportsPrimary<PM>,
    PM: SecondaryMap<K, usize> + UniqueIndex,
    S: Secondaries<K, V, P::Ref>,
    F: StatusFlag,
{
    #[inline]
    fn deref_mut(&mut self) -> &mut V {
        &mut self.buf
    }
}

impl<K, V, P, PM, S, F> Drop for Edit<'_, K, V, P, PM, S, F>
where
    K: Clone + Hash + Eq,
    V: Clone + PartialEq,
    P: Policy<K> + SupportsPrimary<PM>,
    PM: SecondaryMap<K, usize> + UniqueIndex,
    S: Secondaries<K, V, P::Ref>,
    F: StatusFlag,
{
    fn drop(&mut self) {
        if !self.committed {
            self.apply();
        }
    }
}
