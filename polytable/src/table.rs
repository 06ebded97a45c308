//! The multi-index container core.

use core::fmt;
use core::hash::Hash;
use core::marker::PhantomData;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};

use crate::arena::Arena;
use crate::error::Duplicate;
use crate::handle::Handle;
use crate::map::{SecondaryMap, UniqueIndex};
use crate::policy::{Policy, SupportsPrimary};
use crate::record::{Record, RecordMeta};
use crate::secondaries::{Secondaries, Select};
use crate::spec::IndexSpec;
use crate::status::{LiveCount, SharedStatus, StatusFlag};

/// An in-memory table of `(K, V)` records indexed by one primary index and a
/// tuple of secondary indices kept in lockstep.
///
/// * `P` is the relocation [`Policy`]: it decides the arena flavor, whether
///   erase tombstones records, and what secondaries store.
/// * `PM` is the primary map backing, keyed by `K` and holding arena slots.
///   A unique backing makes the primary unique; a multi backing allows
///   duplicate primary keys.
/// * `S` is a tuple of [`IndexSpec`] tags, one per secondary index, written
///   to in declaration order.
/// * `F` picks where implicit edit commits report their outcome and whether
///   the live counter is atomic.
///
/// Every mutating operation leaves the table as if the call never happened
/// when it fails or panics, except for the documented tombstone cases (a
/// failed revival leaves the new payload in the dead record).
pub struct MultiIndex<K, V, P, PM, S, F = SharedStatus>
where
    P: Policy<K> + SupportsPrimary<PM>,
    PM: SecondaryMap<K, usize>,
    S: Secondaries<K, V, P::Ref>,
    F: StatusFlag,
{
    pub(crate) arena: P::Arena<Record<K, V, P::Meta>>,
    pub(crate) primary: PM,
    pub(crate) secondaries: S::Maps,
    pub(crate) policy: P,
    pub(crate) live: F::Live,
    _specs: PhantomData<S>,
}

enum EmplaceOutcome<K, V> {
    Inserted(Handle),
    Exists(Handle, K, V),
    Rejected(K, V),
}

impl<K, V, P, PM, S, F> Default for MultiIndex<K, V, P, PM, S, F>
where
    P: Policy<K> + SupportsPrimary<PM>,
    PM: SecondaryMap<K, usize>,
    S: Secondaries<K, V, P::Ref>,
    F: StatusFlag,
{
    fn default() -> Self {
        MultiIndex {
            arena: Default::default(),
            primary: PM::default(),
            secondaries: S::Maps::default(),
            policy: P::default(),
            live: F::Live::default(),
            _specs: PhantomData,
        }
    }
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
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut table = Self::new();
        table.reserve(capacity);
        table
    }

    /// Number of live records.
    #[inline]
    pub fn len(&self) -> usize {
        if P::TOMBSTONES {
            self.live.get()
        } else {
            self.arena.len()
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of stored records, dead ones included.
    #[inline]
    pub fn physical_len(&self) -> usize {
        self.arena.len()
    }

    /// The primary map backing, for inspection.
    #[inline]
    pub fn primary(&self) -> &PM {
        &self.primary
    }

    /// The policy state, for inspection.
    #[inline]
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// First live record under `key`, if any.
    #[inline]
    pub fn find(&self, key: &K) -> Option<Handle> {
        self.live_slot(key).map(Handle::new)
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.live_slot(key).is_some()
    }

    /// Payload of the first live record under `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        let slot = self.live_slot(key)?;
        self.arena.get(slot).map(|record| &record.payload)
    }

    /// Number of live records under `key`.
    pub fn count(&self, key: &K) -> usize {
        self.primary
            .get_all(key)
            .iter()
            .filter(|&&slot| self.slot_is_live(slot))
            .count()
    }

    /// All live records under `key`, skipping dead entries across the whole
    /// range.
    pub fn get_all(&self, key: &K) -> impl Iterator<Item = Handle> + '_ {
        self.primary
            .get_all(key)
            .iter()
            .copied()
            .filter(|&slot| self.slot_is_live(slot))
            .map(Handle::new)
    }

    /// Key and payload of the record behind `handle`, dead or alive. `None`
    /// for the null handle and for handles whose slot is vacant.
    pub fn resolve(&self, handle: Handle) -> Option<(&K, &V)> {
        if handle.is_null() {
            return None;
        }
        self.arena
            .get(handle.slot())
            .map(|record| (&record.key, &record.payload))
    }

    #[inline]
    pub fn key_of(&self, handle: Handle) -> Option<&K> {
        self.resolve(handle).map(|(key, _)| key)
    }

    #[inline]
    pub fn payload_of(&self, handle: Handle) -> Option<&V> {
        self.resolve(handle).map(|(_, payload)| payload)
    }

    #[inline]
    pub fn is_live(&self, handle: Handle) -> bool {
        !handle.is_null() && self.slot_is_live(handle.slot())
    }

    /// Iterates over live records in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &K, &V)> + '_ {
        self.arena
            .iter()
            .filter(|(_, record)| !record.meta.is_dead())
            .map(|(slot, record)| (Handle::new(slot), &record.key, &record.payload))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(_, key, _)| key)
    }

    /// Inserts a record, or revives a tombstoned one under the same key.
    ///
    /// Returns the handle and whether a record was inserted. A duplicate
    /// primary key yields the existing live handle with `false`; a unique
    /// secondary rejection undoes everything written and yields the null
    /// handle with `false`.
    pub fn emplace(&mut self, key: K, payload: V) -> (Handle, bool) {
        match self.emplace_inner(key, payload) {
            EmplaceOutcome::Inserted(handle) => (handle, true),
            EmplaceOutcome::Exists(handle, _, _) => (handle, false),
            EmplaceOutcome::Rejected(_, _) => (Handle::null(), false),
        }
    }

    /// Like [`emplace`](Self::emplace), but panics when the record is not
    /// inserted.
    pub fn insert(&mut self, key: K, payload: V) -> Handle {
        let (handle, inserted) = self.emplace(key, payload);
        assert!(inserted, "uniqueness violation");
        handle
    }

    /// Like [`emplace`](Self::emplace), but hands the rejected pair back on
    /// failure.
    pub fn try_insert(&mut self, key: K, payload: V) -> Result<Handle, Duplicate<K, V>>
    where
        K: fmt::Debug,
        V: fmt::Debug,
    {
        match self.emplace_inner(key, payload) {
            EmplaceOutcome::Inserted(handle) => Ok(handle),
            EmplaceOutcome::Exists(_, key, payload) | EmplaceOutcome::Rejected(key, payload) => {
                Err(Duplicate { key, payload })
            }
        }
    }

    /// Inserts under a new key, or replaces the payload of the existing
    /// record. Unique primary only. Returns `(null, false)` when the
    /// replacement is rejected by a unique secondary.
    pub fn insert_or_replace(&mut self, key: K, payload: V) -> (Handle, bool)
    where
        PM: UniqueIndex,
        V: PartialEq,
    {
        match self.find(&key) {
            Some(handle) => {
                if self.replace(handle, payload) {
                    (handle, false)
                } else {
                    (Handle::null(), false)
                }
            }
            None => self.emplace(key, payload),
        }
    }

    /// Erases the record behind `handle`: its secondary entries are removed,
    /// then the record is tombstoned (when the policy keeps tombstones) or
    /// physically removed. Returns false for null, vacant and already-dead
    /// handles.
    pub fn remove(&mut self, handle: Handle) -> bool {
        if handle.is_null() {
            return false;
        }
        let slot = handle.slot();
        let token = {
            let Some(record) = self.arena.get(slot) else {
                return false;
            };
            if P::TOMBSTONES && record.meta.is_dead() {
                return false;
            }
            self.policy.make_ref(slot, &record.key, &record.meta)
        };
        {
            let record = self.arena.get(slot).expect("slot checked above");
            S::drop_record(&mut self.secondaries, &record.key, &record.payload, &token);
        }
        if P::TOMBSTONES {
            self.arena
                .get_mut(slot)
                .expect("slot checked above")
                .meta
                .set_dead(true);
            self.live.decr();
        } else {
            self.detach(slot);
        }
        true
    }

    /// Erases every live record under `key`. Returns how many were erased.
    pub fn remove_key(&mut self, key: &K) -> usize {
        let mut removed = 0;
        while let Some(handle) = self.find(key) {
            self.remove(handle);
            removed += 1;
        }
        removed
    }

    /// Erases every record matching `sub_key` in the index tagged `Tag`.
    /// Returns how many were erased.
    pub fn remove_by<Tag, Pos>(
        &mut self,
        sub_key: &<<S as Select<K, V, P::Ref, Tag, Pos>>::Spec as IndexSpec<K, V>>::SubKey,
    ) -> usize
    where
        S: Select<K, V, P::Ref, Tag, Pos>,
    {
        let mut removed = 0;
        loop {
            let Some(token) = <S as Select<K, V, P::Ref, Tag, Pos>>::map(&self.secondaries)
                .first(sub_key)
                .cloned()
            else {
                break;
            };
            let handle = self.policy.resolve(&token, |key| self.live_slot(key));
            if handle.is_null() {
                break;
            }
            let slot = handle.slot();
            {
                let record = self.arena.get(slot).expect("secondary entry resolves");
                S::drop_record_except(
                    &mut self.secondaries,
                    <S as Select<K, V, P::Ref, Tag, Pos>>::POS,
                    &record.key,
                    &record.payload,
                    &token,
                );
            }
            // The current index is erased directly so the loop sees progress.
            <S as Select<K, V, P::Ref, Tag, Pos>>::map_mut(&mut self.secondaries)
                .remove(sub_key, &token);
            if P::TOMBSTONES {
                self.arena
                    .get_mut(slot)
                    .expect("secondary entry resolves")
                    .meta
                    .set_dead(true);
                self.live.decr();
            } else {
                self.detach(slot);
            }
            removed += 1;
        }
        removed
    }

    /// Applies `mutate` to the record's payload, rebuilding its secondary
    /// entries from the result.
    ///
    /// Returns false (payload and indices restored) when the new projections
    /// collide in a unique secondary. Modifying a dead record revives it on
    /// success. A panicking `mutate` restores the pre-call state before it
    /// propagates.
    pub fn modify<M>(&mut self, handle: Handle, mutate: M) -> bool
    where
        M: FnOnce(&mut V),
    {
        if handle.is_null() || self.arena.get(handle.slot()).is_none() {
            return false;
        }
        self.update_core(handle.slot(), mutate)
    }

    /// Replaces the record's payload wholesale. A no-op returning true when
    /// the record is live and already equal to `payload`; otherwise the same
    /// protocol as [`modify`](Self::modify).
    pub fn replace(&mut self, handle: Handle, payload: V) -> bool
    where
        V: PartialEq,
    {
        if handle.is_null() {
            return false;
        }
        let slot = handle.slot();
        let Some(record) = self.arena.get(slot) else {
            return false;
        };
        if !(P::TOMBSTONES && record.meta.is_dead()) && record.payload == payload {
            return true;
        }
        self.update_core(slot, move |dst| *dst = payload)
    }

    /// Rebuilds the table without its dead records, re-densifying policy
    /// state. O(N). Meaningful under tombstones or the translation array; a
    /// plain rebuild otherwise.
    pub fn compact(&mut self) {
        let mut fresh = Self::new();
        fresh.reserve(self.len());
        for (_, record) in self.arena.iter() {
            if !record.meta.is_dead() {
                fresh.emplace(record.key.clone(), record.payload.clone());
            }
        }
        *self = fresh;
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.primary.clear();
        S::clear(&mut self.secondaries);
        self.policy.clear();
        self.live.set(0);
    }

    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    /// Reserves capacity in the arena, the primary map and every secondary.
    pub fn reserve(&mut self, additional: usize) {
        self.arena.reserve(additional);
        self.primary.reserve(additional);
        S::reserve(&mut self.secondaries, additional);
        self.policy.reserve(additional);
    }

    /// Records the arena can hold before reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    pub(crate) fn live_slot(&self, key: &K) -> Option<usize> {
        self.primary
            .get_all(key)
            .iter()
            .copied()
            .find(|&slot| self.slot_is_live(slot))
    }

    #[inline]
    fn slot_is_live(&self, slot: usize) -> bool {
        if !P::TOMBSTONES {
            return self.arena.get(slot).is_some();
        }
        self.arena
            .get(slot)
            .map_or(false, |record| !record.meta.is_dead())
    }

    fn emplace_inner(&mut self, key: K, payload: V) -> EmplaceOutcome<K, V> {
        if PM::UNIQUE {
            if let Some(&slot) = self.primary.first(&key) {
                if P::TOMBSTONES
                    && self
                        .arena
                        .get(slot)
                        .map_or(false, |record| record.meta.is_dead())
                {
                    return self.revive(slot, key, payload);
                }
                return EmplaceOutcome::Exists(Handle::new(slot), key, payload);
            }
        }

        // Publication order: primary first, then secondaries.
        let slot = self.arena.insert(Record::new(key.clone(), payload));
        self.primary.insert(key, slot);
        {
            let record = self.arena.get_mut(slot).expect("slot just filled");
            self.policy.on_emplace_success(slot, &mut record.meta);
        }
        let token = {
            let record = self.arena.get(slot).expect("slot just filled");
            self.policy.make_ref(slot, &record.key, &record.meta)
        };
        let added = {
            let record = self.arena.get(slot).expect("slot just filled");
            let secondaries = &mut self.secondaries;
            catch_unwind(AssertUnwindSafe(|| {
                S::add(secondaries, &record.key, &record.payload, &token)
            }))
        };
        match added {
            Ok(true) => {
                if P::TOMBSTONES {
                    self.live.incr();
                }
                EmplaceOutcome::Inserted(Handle::new(slot))
            }
            Ok(false) => {
                self.policy.on_emplace_fail();
                let record = self.detach(slot);
                EmplaceOutcome::Rejected(record.key, record.payload)
            }
            Err(panic) => {
                // A projection panicked mid-add. Sweep whatever was written;
                // the sweep re-projects and may panic at the same index, by
                // which point everything written before it is already gone.
                {
                    let record = self.arena.get(slot).expect("slot just filled");
                    let secondaries = &mut self.secondaries;
                    let _ = catch_unwind(AssertUnwindSafe(|| {
                        S::drop_record(secondaries, &record.key, &record.payload, &token);
                    }));
                }
                self.policy.on_emplace_fail();
                self.detach(slot);
                resume_unwind(panic)
            }
        }
    }

    /// Revival of a tombstoned record under a unique primary: the dead flag
    /// is cleared, the new payload moves in, and the secondaries are
    /// re-added. On rejection the record goes back to dead, keeping the new
    /// payload.
    fn revive(&mut self, slot: usize, key: K, payload: V) -> EmplaceOutcome<K, V> {
        {
            let record = self.arena.get_mut(slot).expect("revive target");
            record.meta.set_dead(false);
            record.payload = payload;
        }
        let token = {
            let record = self.arena.get(slot).expect("revive target");
            self.policy.make_ref(slot, &record.key, &record.meta)
        };
        let added = {
            let record = self.arena.get(slot).expect("revive target");
            let secondaries = &mut self.secondaries;
            catch_unwind(AssertUnwindSafe(|| {
                S::add(secondaries, &record.key, &record.payload, &token)
            }))
        };
        match added {
            Ok(true) => {
                self.live.incr();
                EmplaceOutcome::Inserted(Handle::new(slot))
            }
            Ok(false) => {
                let record = self.arena.get_mut(slot).expect("revive target");
                record.meta.set_dead(true);
                let payload = record.payload.clone();
                EmplaceOutcome::Rejected(key, payload)
            }
            Err(panic) => {
                {
                    let record = self.arena.get(slot).expect("revive target");
                    let secondaries = &mut self.secondaries;
                    let _ = catch_unwind(AssertUnwindSafe(|| {
                        S::drop_record(secondaries, &record.key, &record.payload, &token);
                    }));
                }
                self.arena
                    .get_mut(slot)
                    .expect("revive target")
                    .meta
                    .set_dead(true);
                resume_unwind(panic)
            }
        }
    }

    /// Physically removes the record in `slot` from arena and primary map.
    /// When the arena relocates another record into the slot, the primary
    /// entry is patched here and the policy patches the secondaries, before
    /// anything else observes the stale slot.
    fn detach(&mut self, slot: usize) -> Record<K, V, P::Meta> {
        let (record, relocation) = self.arena.remove(slot);
        self.primary.remove(&record.key, &slot);
        if let Some(relocation) = relocation {
            let moved = self.arena.get(relocation.new_slot).expect("relocated slot");
            self.primary
                .patch(&moved.key, &relocation.old_slot, &relocation.new_slot);
            self.policy.on_relocate::<V, S>(
                &mut self.secondaries,
                &moved.key,
                &moved.payload,
                &moved.meta,
                relocation.old_slot,
                relocation.new_slot,
            );
        }
        record
    }

    /// Shared drop-and-rebuild body of modify and replace.
    fn update_core<M>(&mut self, slot: usize, mutate: M) -> bool
    where
        M: FnOnce(&mut V),
    {
        let (old, was_dead, token) = {
            let record = self.arena.get(slot).expect("checked by caller");
            (
                record.payload.clone(),
                P::TOMBSTONES && record.meta.is_dead(),
                self.policy.make_ref(slot, &record.key, &record.meta),
            )
        };
        if !was_dead {
            let record = self.arena.get(slot).expect("checked by caller");
            S::drop_record(&mut self.secondaries, &record.key, &record.payload, &token);
        } else {
            // Mutation revives; the flag goes back up if anything fails.
            self.arena
                .get_mut(slot)
                .expect("checked by caller")
                .meta
                .set_dead(false);
        }

        let mutated = {
            let arena = &mut self.arena;
            catch_unwind(AssertUnwindSafe(move || {
                mutate(&mut arena.get_mut(slot).expect("checked by caller").payload);
            }))
        };
        if let Err(panic) = mutated {
            self.restore_record(slot, old, was_dead, &token);
            resume_unwind(panic);
        }

        let added = {
            let record = self.arena.get(slot).expect("checked by caller");
            let secondaries = &mut self.secondaries;
            catch_unwind(AssertUnwindSafe(|| {
                S::add(secondaries, &record.key, &record.payload, &token)
            }))
        };
        match added {
            Ok(true) => {
                if was_dead {
                    self.live.incr();
                }
                true
            }
            Ok(false) => {
                self.restore_record(slot, old, was_dead, &token);
                false
            }
            Err(panic) => {
                {
                    let record = self.arena.get(slot).expect("checked by caller");
                    let secondaries = &mut self.secondaries;
                    let _ = catch_unwind(AssertUnwindSafe(|| {
                        S::drop_record(secondaries, &record.key, &record.payload, &token);
                    }));
                }
                self.restore_record(slot, old, was_dead, &token);
                resume_unwind(panic)
            }
        }
    }

    /// Puts the old payload and dead flag back and, when the record was
    /// live, re-adds its secondary entries. Re-adding what was present
    /// before cannot collide.
    fn restore_record(&mut self, slot: usize, old: V, was_dead: bool, token: &P::Ref) {
        {
            let record = self.arena.get_mut(slot).expect("checked by caller");
            record.payload = old;
            record.meta.set_dead(was_dead);
        }
        if !was_dead {
            let record = self.arena.get(slot).expect("checked by caller");
            let _restored = S::add(&mut self.secondaries, &record.key, &record.payload, token);
            debug_assert!(_restored, "restoring the previous payload cannot collide");
        }
    }
}

impl<K, V, P, PM, S, F> Clone for MultiIndex<K, V, P, PM, S, F>
where
    K: Clone,
    V: Clone,
    P: Policy<K> + SupportsPrimary<PM> + Clone,
    P::Arena<Record<K, V, P::Meta>>: Clone,
    PM: SecondaryMap<K, usize> + Clone,
    S: Secondaries<K, V, P::Ref>,
    S::Maps: Clone,
    F: StatusFlag,
    F::Live: Clone,
{
    fn clone(&self) -> Self {
        // Slot references are positions, not addresses, so a memberwise
        // clone stays coherent for every policy.
        MultiIndex {
            arena: self.arena.clone(),
            primary: self.primary.clone(),
            secondaries: self.secondaries.clone(),
            policy: self.policy.clone(),
            live: self.live.clone(),
            _specs: PhantomData,
        }
    }
}

impl<K, V, P, PM, S, F> fmt::Debug for MultiIndex<K, V, P, PM, S, F>
where
    K: Clone + Hash + Eq + fmt::Debug,
    V: Clone + fmt::Debug,
    P: Policy<K> + SupportsPrimary<PM>,
    PM: SecondaryMap<K, usize>,
    S: Secondaries<K, V, P::Ref>,
    F: StatusFlag,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(_, key, payload)| (key, payload)))
            .finish()
    }
}

impl<K, V, P, PM, S, F> FromIterator<(K, V)> for MultiIndex<K, V, P, PM, S, F>
where
    K: Clone + Hash + Eq,
    V: Clone,
    P: Policy<K> + SupportsPrimary<PM>,
    PM: SecondaryMap<K, usize>,
    S: Secondaries<K, V, P::Ref>,
    F: StatusFlag,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (key, payload) in iter {
            table.emplace(key, payload);
        }
        table
    }
}

impl<K, V, P, PM, S, F> Extend<(K, V)> for MultiIndex<K, V, P, PM, S, F>
where
    K: Clone + Hash + Eq,
    V: Clone,
    P: Policy<K> + SupportsPrimary<PM>,
    PM: SecondaryMap<K, usize>,
    S: Secondaries<K, V, P::Ref>,
    F: StatusFlag,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, payload) in iter {
            self.emplace(key, payload);
        }
    }
}
