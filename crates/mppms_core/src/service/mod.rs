//! Pure derivations over loaded entity snapshots.
//!
//! # Responsibility
//! - Build the project hierarchy from flat association sets.
//! - Drive choose-from-universe association edits.
//! - Compute asset membership, which is never stored on the asset.
//!
//! Nothing here performs I/O; controllers load data and pass it in.

pub mod hierarchy;
pub mod membership;
pub mod relationship;
