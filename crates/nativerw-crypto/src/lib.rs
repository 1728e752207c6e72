//! Content hashing for the native store.
//!
//! Publishers may send a digest of the payload they are about to write. If it
//! matches the digest of the latest stored revision, the write is redundant
//! (a redelivery or retry) and can be skipped.

pub mod digest;
pub mod hasher;

pub use digest::ContentDigest;
pub use hasher::{HasherError, NativeHasher};
