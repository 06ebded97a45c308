use core::fmt::Debug;

use thiserror::Error;

/// An insert was rejected by the primary or by a unique secondary index.
///
/// Carries the rejected pair back to the caller so nothing is lost on the
/// error path.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("entry for key {key:?} rejected by a unique index")]
pub struct Duplicate<K: Debug, V: Debug> {
    pub key: K,
    pub payload: V,
}
