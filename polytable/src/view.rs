//! Per-index facades over a [`MultiIndex`].
//!
//! A view borrows the table and exposes one secondary index with a map-like
//! surface. Lookups hand back [`Handle`]s materialized through the policy,
//! so the caller sees the same currency regardless of what the index
//! actually stores. Mutating operations live on [`ViewMut`] and delegate to
//! the table core, which keeps every other index in lockstep.

use core::hash::Hash;
use core::marker::PhantomData;

use crate::handle::Handle;
use crate::map::SecondaryMap;
use crate::policy::{Policy, SupportsPrimary};
use crate::secondaries::{Secondaries, Select};
use crate::spec::IndexSpec;
use crate::status::StatusFlag;
use crate::table::MultiIndex;

/// Read access to one secondary index.
pub struct View<'a, K, V, P, PM, S, F, Tag, Pos>
where
    P: Policy<K> + SupportsPrimary<PM>,
    PM: SecondaryMap<K, usize>,
    S: Secondaries<K, V, P::Ref>,
    F: StatusFlag,
{
    table: &'a MultiIndex<K, V, P, PM, S, F>,
    _select: PhantomData<(Tag, Pos)>,
}

/// Write access to one secondary index.
pub struct ViewMut<'a, K, V, P, PM, S, F, Tag, Pos>
where
    P: Policy<K> + SupportsPrimary<PM>,
    PM: SecondaryMap<K, usize>,
    S: Secondaries<K, V, P::Ref>,
    F: StatusFlag,
{
    table: &'a mut MultiIndex<K, V, P, PM, S, F>,
    _select: PhantomData<(Tag, Pos)>,
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
    /// Read view of the index tagged `Tag`. The position parameter is
    /// inferred: `table.by::<ByCategory, _>()`.
    pub fn by<Tag, Pos>(&self) -> View<'_, K, V, P, PM, S, F, Tag, Pos>
    where
        S: Select<K, V, P::Ref, Tag, Pos>,
    {
        View {
            table: self,
            _select: PhantomData,
        }
    }

    /// Write view of the index tagged `Tag`.
    pub fn by_mut<Tag, Pos>(&mut self) -> ViewMut<'_, K, V, P, PM, S, F, Tag, Pos>
    where
        S: Select<K, V, P::Ref, Tag, Pos>,
    {
        ViewMut {
            table: self,
            _select: PhantomData,
        }
    }
}

impl<'a, K, V, P, PM, S, F, Tag, Pos> View<'a, K, V, P, PM, S, F, Tag, Pos>
where
    K: Clone + Hash + Eq,
    V: Clone,
    P: Policy<K> + SupportsPrimary<PM>,
    PM: SecondaryMap<K, usize>,
    S: Secondaries<K, V, P::Ref> + Select<K, V, P::Ref, Tag, Pos>,
    F: StatusFlag,
{
    /// The record behind the first entry under `sub_key`.
    pub fn find(&self, sub_key: &<S::Spec as IndexSpec<K, V>>::SubKey) -> Option<Handle> {
        let table = self.table;
        let token = <S as Select<K, V, P::Ref, Tag, Pos>>::map(&table.secondaries).first(sub_key)?;
        let handle = table.policy.resolve(token, |key| table.live_slot(key));
        (!handle.is_null()).then_some(handle)
    }

    /// Every record stored under `sub_key`, in insertion order.
    pub fn get_all(
        &self,
        sub_key: &<S::Spec as IndexSpec<K, V>>::SubKey,
    ) -> impl Iterator<Item = Handle> + 'a
    where
        <S::Spec as IndexSpec<K, V>>::Map<P::Ref>: 'a,
    {
        let table = self.table;
        <S as Select<K, V, P::Ref, Tag, Pos>>::map(&table.secondaries)
            .get_all(sub_key)
            .iter()
            .map(move |token| table.policy.resolve(token, |key| table.live_slot(key)))
    }

    pub fn contains(&self, sub_key: &<S::Spec as IndexSpec<K, V>>::SubKey) -> bool {
        <S as Select<K, V, P::Ref, Tag, Pos>>::map(&self.table.secondaries).contains_key(sub_key)
    }

    pub fn count(&self, sub_key: &<S::Spec as IndexSpec<K, V>>::SubKey) -> usize {
        <S as Select<K, V, P::Ref, Tag, Pos>>::map(&self.table.secondaries).count(sub_key)
    }

    /// Number of entries in this index. Dead records have no entries, so
    /// this equals the number of live records it covers.
    pub fn len(&self) -> usize {
        <S as Select<K, V, P::Ref, Tag, Pos>>::map(&self.table.secondaries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over (sub-key, record) entries.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&'a <S::Spec as IndexSpec<K, V>>::SubKey, Handle)> + 'a
    where
        <S::Spec as IndexSpec<K, V>>::Map<P::Ref>: 'a,
        <S::Spec as IndexSpec<K, V>>::SubKey: 'a,
    {
        let table = self.table;
        <S as Select<K, V, P::Ref, Tag, Pos>>::map(&table.secondaries)
            .iter()
            .map(move |(sub_key, token)| {
                (
                    sub_key,
                    table.policy.resolve(token, |key| table.live_slot(key)),
                )
            })
    }
}

impl<'a, K, V, P, PM, S, F, Tag, Pos> ViewMut<'a, K, V, P, PM, S, F, Tag, Pos>
where
    K: Clone + Hash + Eq,
    V: Clone,
    P: Policy<K> + SupportsPrimary<PM>,
    PM: SecondaryMap<K, usize>,
    S: Secondaries<K, V, P::Ref> + Select<K, V, P::Ref, Tag, Pos>,
    F: StatusFlag,
{
    pub fn find(&self, sub_key: &<S::Spec as IndexSpec<K, V>>::SubKey) -> Option<Handle> {
        let token =
            <S as Select<K, V, P::Ref, Tag, Pos>>::map(&self.table.secondaries).first(sub_key)?;
        let handle = self
            .table
            .policy
            .resolve(token, |key| self.table.live_slot(key));
        (!handle.is_null()).then_some(handle)
    }

    pub fn contains(&self, sub_key: &<S::Spec as IndexSpec<K, V>>::SubKey) -> bool {
        <S as Select<K, V, P::Ref, Tag, Pos>>::map(&self.table.secondaries).contains_key(sub_key)
    }

    pub fn count(&self, sub_key: &<S::Spec as IndexSpec<K, V>>::SubKey) -> usize {
        <S as Select<K, V, P::Ref, Tag, Pos>>::map(&self.table.secondaries).count(sub_key)
    }

    pub fn len(&self) -> usize {
        <S as Select<K, V, P::Ref, Tag, Pos>>::map(&self.table.secondaries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Erases every record under `sub_key` in this index. Returns how many
    /// were erased.
    pub fn remove_key(&mut self, sub_key: &<S::Spec as IndexSpec<K, V>>::SubKey) -> usize {
        self.table.remove_by::<Tag, Pos>(sub_key)
    }

    /// Erases one record through this view.
    pub fn remove(&mut self, handle: Handle) -> bool {
        self.table.remove(handle)
    }

    pub fn modify<M>(&mut self, handle: Handle, mutate: M) -> bool
    where
        M: FnOnce(&mut V),
    {
        self.table.modify(handle, mutate)
    }

    pub fn replace(&mut self, handle: Handle, payload: V) -> bool
    where
        V: PartialEq,
    {
        self.table.replace(handle, payload)
    }
}
