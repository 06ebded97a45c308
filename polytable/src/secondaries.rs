//! Operations over the tuple of secondary indices.
//!
//! The secondary indices of a table are a tuple of [`IndexSpec`] tags; this
//! module gives that tuple its behavior. Writes go in declaration order, and
//! a unique rejection at position i removes what positions 0..i already
//! wrote, so callers observe all-or-nothing. The full removal walk performs
//! only projections, lookups and single-entry removals and therefore cannot
//! panic on its own; the table's rollback paths depend on that.

use crate::map::SecondaryMap;
use crate::spec::IndexSpec;

/// A tuple of secondary index specs, with lockstep operations over the
/// corresponding tuple of maps.
pub trait Secondaries<K, V, R: Clone + Eq> {
    /// The tuple of map backings, one per spec, each storing `R` tokens.
    type Maps: Default;

    /// Number of secondary indices.
    const LEN: usize;

    /// Adds one record to every index, in declaration order. On a unique
    /// rejection, already-written entries are removed again and `false` is
    /// returned.
    fn add(maps: &mut Self::Maps, key: &K, payload: &V, token: &R) -> bool;

    /// Removes one record's entry from every index.
    fn drop_record(maps: &mut Self::Maps, key: &K, payload: &V, token: &R);

    /// Removes one record's entry from every index except the one at
    /// position `skip`.
    fn drop_record_except(maps: &mut Self::Maps, skip: usize, key: &K, payload: &V, token: &R);

    /// Rewrites the record's stored token in every index from `old` to
    /// `new`. Used by handle-storing policies after a relocation.
    fn patch(maps: &mut Self::Maps, key: &K, payload: &V, old: &R, new: &R);

    fn clear(maps: &mut Self::Maps);

    fn reserve(maps: &mut Self::Maps, additional: usize);
}

/// Selects one index out of a [`Secondaries`] tuple by its tag.
///
/// `Pos` is a type-level position ([`Here`] / [`There`]) that exists only so
/// inference can pick the right impl; call sites leave it inferred, as in
/// `table.by::<Tag, _>()`. A tag that occurs twice in the tuple is ambiguous
/// and fails to compile.
pub trait Select<K, V, R: Clone + Eq, Tag, Pos>: Secondaries<K, V, R> {
    type Spec: IndexSpec<K, V>;

    /// Position of the selected index in the tuple.
    const POS: usize;

    fn map(maps: &Self::Maps) -> &<Self::Spec as IndexSpec<K, V>>::Map<R>;

    fn map_mut(maps: &mut Self::Maps) -> &mut <Self::Spec as IndexSpec<K, V>>::Map<R>;
}

/// Type-level position marker: the head of the tuple.
pub struct Here;

/// Type-level position marker: one past `P`.
pub struct There<P>(core::marker::PhantomData<P>);

impl<K, V, R: Clone + Eq> Secondaries<K, V, R> for () {
    type Maps = ();

    const LEN: usize = 0;

    #[inline]
    fn add(_maps: &mut (), _key: &K, _payload: &V, _token: &R) -> bool {
        true
    }

    #[inline]
    fn drop_record(_maps: &mut (), _key: &K, _payload: &V, _token: &R) {}

    #[inline]
    fn drop_record_except(_maps: &mut (), _skip: usize, _key: &K, _payload: &V, _token: &R) {}

    #[inline]
    fn patch(_maps: &mut (), _key: &K, _payload: &V, _old: &R, _new: &R) {}

    #[inline]
    fn clear(_maps: &mut ()) {}

    #[inline]
    fn reserve(_maps: &mut (), _additional: usize) {}
}

macro_rules! impl_secondaries {
    ($(($idx:tt, $S:ident)),+) => {
        impl<K, V, R, $($S),+> Secondaries<K, V, R> for ($($S,)+)
        where
            R: Clone + Eq,
            $($S: IndexSpec<K, V>,)+
        {
            type Maps = ($(<$S as IndexSpec<K, V>>::Map<R>,)+);

            const LEN: usize = [$($idx),+].len();

            fn add(maps: &mut Self::Maps, key: &K, payload: &V, token: &R) -> bool {
                let mut written = 0usize;
                let ok = loop {
                    $(
                        if !maps.$idx.insert(<$S as IndexSpec<K, V>>::project(key, payload), token.clone()) {
                            break false;
                        }
                        written += 1;
                    )+
                    break true;
                };
                if !ok {
                    // Unwind the indices written before the rejection.
                    $(
                        if $idx < written {
                            maps.$idx.remove(&<$S as IndexSpec<K, V>>::project(key, payload), token);
                        }
                    )+
                }
                ok
            }

            fn drop_record(maps: &mut Self::Maps, key: &K, payload: &V, token: &R) {
                $(
                    maps.$idx.remove(&<$S as IndexSpec<K, V>>::project(key, payload), token);
                )+
            }

            fn drop_record_except(
                maps: &mut Self::Maps,
                skip: usize,
                key: &K,
                payload: &V,
                token: &R,
            ) {
                $(
                    if $idx != skip {
                        maps.$idx.remove(&<$S as IndexSpec<K, V>>::project(key, payload), token);
                    }
                )+
            }

            fn patch(maps: &mut Self::Maps, key: &K, payload: &V, old: &R, new: &R) {
                $(
                    maps.$idx.patch(&<$S as IndexSpec<K, V>>::project(key, payload), old, new);
                )+
            }

            fn clear(maps: &mut Self::Maps) {
                $(
                    maps.$idx.clear();
                )+
            }

            fn reserve(maps: &mut Self::Maps, additional: usize) {
                $(
                    maps.$idx.reserve(additional);
                )+
            }
        }
    };
}

macro_rules! impl_select {
    ($pos:ty, $n:tt, $Tag:ident, ($($S:ident),+)) => {
        impl<K, V, R, $($S),+> Select<K, V, R, $Tag, $pos> for ($($S,)+)
        where
            R: Clone + Eq,
            $($S: IndexSpec<K, V>,)+
        {
            type Spec = $Tag;

            const POS: usize = $n;

            #[inline]
            fn map(maps: &Self::Maps) -> &<$Tag as IndexSpec<K, V>>::Map<R> {
                &maps.$n
            }

            #[inline]
            fn map_mut(maps: &mut Self::Maps) -> &mut <$Tag as IndexSpec<K, V>>::Map<R> {
                &mut maps.$n
            }
        }
    };
}

impl_secondaries!((0, A));
impl_secondaries!((0, A), (1, B));
impl_secondaries!((0, A), (1, B), (2, C));
impl_secondaries!((0, A), (1, B), (2, C), (3, D));
impl_secondaries!((0, A), (1, B), (2, C), (3, D), (4, E));
impl_secondaries!((0, A), (1, B), (2, C), (3, D), (4, E), (5, G));

impl_select!(Here, 0, A, (A));

impl_select!(Here, 0, A, (A, B));
impl_select!(There<Here>, 1, B, (A, B));

impl_select!(Here, 0, A, (A, B, C));
impl_select!(There<Here>, 1, B, (A, B, C));
impl_select!(There<There<Here>>, 2, C, (A, B, C));

impl_select!(Here, 0, A, (A, B, C, D));
impl_select!(There<Here>, 1, B, (A, B, C, D));
impl_select!(There<There<Here>>, 2, C, (A, B, C, D));
impl_select!(There<There<There<Here>>>, 3, D, (A, B, C, D));

impl_select!(Here, 0, A, (A, B, C, D, E));
impl_select!(There<Here>, 1, B, (A, B, C, D, E));
impl_select!(There<There<Here>>, 2, C, (A, B, C, D, E));
impl_select!(There<There<There<Here>>>, 3, D, (A, B, C, D, E));
impl_select!(There<There<There<There<Here>>>>, 4, E, (A, B, C, D, E));

impl_select!(Here, 0, A, (A, B, C, D, E, G));
impl_select!(There<Here>, 1, B, (A, B, C, D, E, G));
impl_select!(There<There<Here>>, 2, C, (A, B, C, D, E, G));
impl_select!(There<There<There<Here>>>, 3, D, (A, B, C, D, E, G));
impl_select!(There<There<There<There<Here>>>>, 4, E, (A, B, C, D, E, G));
impl_select!(There<There<There<There<There<Here>>>>>, 5, G, (A, B, C, D, E, G));
