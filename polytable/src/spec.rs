//! Compile-time description of one secondary index.

use core::hash::Hash;

use crate::map::SecondaryMap;

/// One secondary index over a table of `(K, V)` records.
///
/// The implementing type is a zero-sized tag: it names the index in the
/// secondary tuple and selects it at lookup sites (`table.by::<Tag, _>()`).
/// `project` must be pure: same key and payload, same sub-key, every time.
/// The map associated type is generic over the stored reference token because
/// that token is the policy's choice, not the index's.
///
/// ```
/// use polytable::{IndexSpec, MultiHashMap};
///
/// struct Product {
///     category: String,
///     price_cents: u64,
/// }
///
/// struct ByCategory;
///
/// impl IndexSpec<u32, Product> for ByCategory {
///     type SubKey = String;
///     type Map<R: Clone + Eq> = MultiHashMap<String, R>;
///
///     fn project(_id: &u32, product: &Product) -> String {
///         product.category.clone()
///     }
/// }
/// ```
pub trait IndexSpec<K, V> {
    /// The value this index is keyed by.
    type SubKey: Clone + Hash + Eq;

    /// Map backing, instantiated with the policy's reference token.
    type Map<R: Clone + Eq>: SecondaryMap<Self::SubKey, R>;

    /// Computes the sub-key of a record. May use the primary key, the
    /// payload, or both.
    fn project(key: &K, payload: &V) -> Self::SubKey;
}
