//! Relocation policies: how secondaries reference records and how that
//! reference survives the primary storage moving records around.
//!
//! A policy picks, at compile time, the arena flavor, the record metadata
//! shape, and the reference token stored in every secondary entry. The table
//! calls the small hook surface below at the points where coherence could
//! break; everything monomorphizes, there is no dynamic dispatch.
//!
//! | policy | arena | secondary stores | relocation cost |
//! |---|---|---|---|
//! | [`NoInvalidate`] | stable | handle | never relocates |
//! | [`UpdatePointer`] | dense | handle | equal-range walk per secondary |
//! | [`TranslationArray`] | dense | ordinal | one translation-array write |
//! | [`KeyLookup`] | stable | primary key | never relocates |

use core::marker::PhantomData;

use crate::arena::{DenseArena, StableArena};
use crate::handle::Handle;
use crate::map::UniqueIndex;
use crate::record::{DeadFlag, HandleMeta, Ordinal, OrdinalDead, Plain, RecordMeta, TranslMeta};
use crate::secondaries::Secondaries;

/// Strategy for keeping secondary indices coherent with primary storage.
///
/// `make_ref` produces the token a secondary entry stores for a record and
/// `resolve` is its inverse; `find` is a primary lookup used only by
/// policies that store the primary key. Matching a secondary entry against a
/// record is token equality: each record owns exactly one token per policy.
pub trait Policy<K>: Default {
    /// Whether the arena may move records, invalidating raw slots.
    const INVALIDATES: bool;
    /// Whether a central translation array is maintained.
    const NEEDS_TRANSLATION: bool;
    /// Whether secondaries store handles directly.
    const STORES_HANDLE: bool;
    /// Whether erase tombstones records instead of removing them.
    const TOMBSTONES: bool;

    type Meta: RecordMeta;
    type Ref: Clone + Eq;
    type Arena<T>: crate::arena::Arena<T>;

    /// Called after the primary insert succeeded, before any secondary is
    /// written.
    #[inline]
    fn on_emplace_success(&mut self, _slot: usize, _meta: &mut Self::Meta) {}

    /// Undoes `on_emplace_success` when a later secondary insert failed.
    #[inline]
    fn on_emplace_fail(&mut self) {}

    /// Called after the arena moved a surviving record from `old_slot` to
    /// `new_slot` and before any further index mutation. `key`, `payload`
    /// and `meta` belong to the record in its new slot.
    #[inline]
    fn on_relocate<V, S>(
        &mut self,
        _maps: &mut S::Maps,
        _key: &K,
        _payload: &V,
        _meta: &Self::Meta,
        _old_slot: usize,
        _new_slot: usize,
    ) where
        S: Secondaries<K, V, Self::Ref>,
        Self: Sized,
    {
    }

    /// The token a secondary entry stores for the record in `slot`.
    fn make_ref(&self, slot: usize, key: &K, meta: &Self::Meta) -> Self::Ref;

    /// Resolves a stored token back to a handle. Returns the null handle if
    /// the token no longer names a record.
    fn resolve<F>(&self, stored: &Self::Ref, find: F) -> Handle
    where
        F: FnOnce(&K) -> Option<usize>;

    #[inline]
    fn clear(&mut self) {}

    #[inline]
    fn reserve(&mut self, _additional: usize) {}
}

/// For node-stable primaries. Secondaries store handles directly and no
/// relocation handling exists because none can happen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoInvalidate;

impl<K> Policy<K> for NoInvalidate {
    const INVALIDATES: bool = false;
    const NEEDS_TRANSLATION: bool = false;
    const STORES_HANDLE: bool = true;
    const TOMBSTONES: bool = false;

    type Meta = Plain;
    type Ref = Handle;
    type Arena<T> = StableArena<T>;

    #[inline]
    fn make_ref(&self, slot: usize, _key: &K, _meta: &Plain) -> Handle {
        Handle::new(slot)
    }

    #[inline]
    fn resolve<F>(&self, stored: &Handle, _find: F) -> Handle
    where
        F: FnOnce(&K) -> Option<usize>,
    {
        *stored
    }
}

/// For dense, relocating primaries. Secondaries store handles; every
/// relocation walks the equal-range of each secondary under the survivor's
/// projections and rewrites the handle that pointed at the old slot.
///
/// `M` selects the tombstone variant; use [`UpdatePointerTombstones`] for
/// lazy deletion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdatePointer<M: HandleMeta = Plain> {
    _meta: PhantomData<M>,
}

/// [`UpdatePointer`] with tombstoned records.
pub type UpdatePointerTombstones = UpdatePointer<DeadFlag>;

impl<K, M: HandleMeta> Policy<K> for UpdatePointer<M> {
    const INVALIDATES: bool = true;
    const NEEDS_TRANSLATION: bool = false;
    const STORES_HANDLE: bool = true;
    const TOMBSTONES: bool = M::TOMBSTONES;

    type Meta = M;
    type Ref = Handle;
    type Arena<T> = DenseArena<T>;

    fn on_relocate<V, S>(
        &mut self,
        maps: &mut S::Maps,
        key: &K,
        payload: &V,
        _meta: &M,
        old_slot: usize,
        new_slot: usize,
    ) where
        S: Secondaries<K, V, Handle>,
    {
        S::patch(
            maps,
            key,
            payload,
            &Handle::new(old_slot),
            &Handle::new(new_slot),
        );
    }

    #[inline]
    fn make_ref(&self, slot: usize, _key: &K, _meta: &M) -> Handle {
        Handle::new(slot)
    }

    #[inline]
    fn resolve<F>(&self, stored: &Handle, _find: F) -> Handle
    where
        F: FnOnce(&K) -> Option<usize>,
    {
        *stored
    }
}

/// For dense primaries under heavy churn. Secondaries store ordinals into a
/// central translation array; a relocation rewrites one array element.
///
/// `M` selects the tombstone variant; use [`TranslationArrayTombstones`]
/// for lazy deletion. Physically erased records leave their array element
/// stale but unreferenced; `compact` re-densifies.
#[derive(Clone, Debug, Default)]
pub struct TranslationArray<M: TranslMeta = Ordinal> {
    translation: Vec<usize>,
    _meta: PhantomData<M>,
}

/// [`TranslationArray`] with tombstoned records.
pub type TranslationArrayTombstones = TranslationArray<OrdinalDead>;

impl<K, M: TranslMeta> Policy<K> for TranslationArray<M> {
    const INVALIDATES: bool = true;
    const NEEDS_TRANSLATION: bool = true;
    const STORES_HANDLE: bool = false;
    const TOMBSTONES: bool = M::TOMBSTONES;

    type Meta = M;
    type Ref = usize;
    type Arena<T> = DenseArena<T>;

    fn on_emplace_success(&mut self, slot: usize, meta: &mut M) {
        self.translation.push(slot);
        meta.set_ordinal(self.translation.len() - 1);
    }

    fn on_emplace_fail(&mut self) {
        self.translation.pop();
    }

    fn on_relocate<V, S>(
        &mut self,
        _maps: &mut S::Maps,
        _key: &K,
        _payload: &V,
        meta: &M,
        _old_slot: usize,
        new_slot: usize,
    ) where
        S: Secondaries<K, V, usize>,
    {
        self.translation[meta.ordinal()] = new_slot;
    }

    #[inline]
    fn make_ref(&self, _slot: usize, _key: &K, meta: &M) -> usize {
        meta.ordinal()
    }

    #[inline]
    fn resolve<F>(&self, stored: &usize, _find: F) -> Handle
    where
        F: FnOnce(&K) -> Option<usize>,
    {
        self.translation
            .get(*stored)
            .map(|&slot| Handle::new(slot))
            .unwrap_or_default()
    }

    #[inline]
    fn clear(&mut self) {
        self.translation.clear();
    }

    #[inline]
    fn reserve(&mut self, additional: usize) {
        self.translation.reserve(additional);
    }
}

impl<M: TranslMeta> TranslationArray<M> {
    /// Number of translation-array elements, stale ones included.
    #[inline]
    pub fn translation_len(&self) -> usize {
        self.translation.len()
    }
}

/// Compile-time compatibility between a policy and a primary map backing.
///
/// Every built-in policy accepts every backing except [`KeyLookup`], whose
/// stored primary-key tokens only name one record when the primary is
/// unique; pairing it with a multi primary is rejected at compile time.
pub trait SupportsPrimary<PM> {}

impl<PM> SupportsPrimary<PM> for NoInvalidate {}

impl<M: HandleMeta, PM> SupportsPrimary<PM> for UpdatePointer<M> {}

impl<M: TranslMeta, PM> SupportsPrimary<PM> for TranslationArray<M> {}

impl<PM: UniqueIndex> SupportsPrimary<PM> for KeyLookup {}

/// Secondaries store a copy of the primary key and resolve it with a primary
/// lookup on every access. Requires a unique primary, which
/// [`SupportsPrimary`] enforces at compile time: under a multi primary two
/// records could share a token and resolution would be ambiguous.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyLookup;

impl<K: Clone + Eq> Policy<K> for KeyLookup {
    const INVALIDATES: bool = false;
    const NEEDS_TRANSLATION: bool = false;
    const STORES_HANDLE: bool = false;
    const TOMBSTONES: bool = false;

    type Meta = Plain;
    type Ref = K;
    type Arena<T> = StableArena<T>;

    #[inline]
    fn make_ref(&self, _slot: usize, key: &K, _meta: &Plain) -> K {
        key.clone()
    }

    #[inline]
    fn resolve<F>(&self, stored: &K, find: F) -> Handle
    where
        F: FnOnce(&K) -> Option<usize>,
    {
        find(stored).map(Handle::new).unwrap_or_default()
    }
}
