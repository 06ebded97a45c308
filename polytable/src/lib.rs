//! An in-memory container with one table and many indices.
//!
//! A [`MultiIndex`] stores (key, payload) records under a primary index and
//! keeps any number of secondary indices consistent with it through every
//! insert, erase, modify and replace. Secondary indices are described at
//! compile time by [`IndexSpec`] tags and derive their entries from pure
//! projections of the stored records; they are updated automatically so they
//! can never drift from the table.
//!
//! How secondaries refer back to records is the job of the relocation
//! [`Policy`]. Four are built in: [`NoInvalidate`] for slot-stable storage,
//! [`UpdatePointer`] and [`TranslationArray`] for dense storage that moves
//! records on erase, and [`KeyLookup`] which stores primary keys and looks
//! them up on access. The pointer-updating and translation policies come in
//! tombstoning variants where erase marks records dead in place, keeping
//! them available for revival until [`MultiIndex::compact`] runs.
//!
//! Mutations that touch several indices are all-or-nothing: a unique-index
//! rejection rolls back everything already written and reports `false`, and
//! a panicking user closure restores the pre-call state before propagating.
//!
//! # Example
//!
//! ```
//! use polytable::{IndexSpec, MultiHashMap, MultiIndex, NoInvalidate, UniqueHashMap};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Product {
//!     name: String,
//!     category: String,
//! }
//!
//! struct ByCategory;
//!
//! impl IndexSpec<u32, Product> for ByCategory {
//!     type SubKey = String;
//!     type Map<R: Clone + Eq> = MultiHashMap<String, R>;
//!
//!     fn project(_id: &u32, product: &Product) -> String {
//!         product.category.clone()
//!     }
//! }
//!
//! type Catalog = MultiIndex<u32, Product, NoInvalidate, UniqueHashMap<u32, usize>, (ByCategory,)>;
//!
//! let mut catalog = Catalog::new();
//! catalog.emplace(1, Product { name: "widget".into(), category: "hardware".into() });
//! catalog.emplace(2, Product { name: "gizmo".into(), category: "software".into() });
//! catalog.emplace(3, Product { name: "tool".into(), category: "hardware".into() });
//!
//! let hardware = "hardware".to_string();
//! assert_eq!(catalog.by::<ByCategory, _>().count(&hardware), 2);
//! assert_eq!(catalog.remove_by::<ByCategory, _>(&hardware), 2);
//! assert_eq!(catalog.len(), 1);
//! ```
//!
//! # Notes
//!
//!  - Projected sub-keys and primary keys are cloned into the index maps, so
//!    index on fields that are cheap to clone.
//!  - Handles are arena slots, not pointers. They survive every relocation
//!    the policy handles, but a physically removed record's handles go stale
//!    and may later observe a record that reused the slot.
//!  - Concurrent modification and durability are out of scope. All mutation
//!    goes through `&mut self`; the only concurrency concession is the
//!    atomic live counter selected by [`ThreadStatus`].
//!  - Hashed index backings use the `ahash` crate, stable slot storage uses
//!    `slab`. Any type implementing [`SecondaryMap`] works as a backing.

mod arena;
mod edit;
mod error;
mod handle;
mod map;
mod policy;
mod record;
mod secondaries;
mod spec;
mod status;
mod table;
mod view;

pub use arena::{Arena, DenseArena, Relocation, StableArena};
pub use edit::Edit;
pub use error::Duplicate;
pub use handle::Handle;
pub use map::{MultiHashMap, MultiIter, SecondaryMap, UniqueHashMap, UniqueIndex};
pub use policy::{
    KeyLookup, NoInvalidate, Policy, SupportsPrimary, TranslationArray,
    TranslationArrayTombstones, UpdatePointer, UpdatePointerTombstones,
};
pub use record::{DeadFlag, HandleMeta, Ordinal, OrdinalDead, Plain, RecordMeta, TranslMeta};
pub use secondaries::{Here, Secondaries, Select, There};
pub use spec::IndexSpec;
pub use status::{AtomicCount, LiveCount, PlainCount, SharedStatus, StatusFlag, ThreadStatus};
pub use table::MultiIndex;
pub use view::{View, ViewMut};

pub use polytable_derive::PolyTable;
