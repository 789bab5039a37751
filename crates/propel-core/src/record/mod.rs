//! Environment configuration records: location and mutation.
//!
//! One record exists per environment at a deterministic path inside the
//! configuration repository. The core owns exactly two fields of it,
//! `image.repository` and `image.tag`; everything else is opaque pass-through
//! content that must survive a mutation byte for byte.

mod locator;
mod mutator;

pub use locator::{ConfigRecordRef, RecordLayout, locate};
pub use mutator::{MutationResult, mutate};
