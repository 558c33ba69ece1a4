//! Hashing primitives.

/// A fast, non-cryptographic hash implementation optimized for quality.
///
/// Suitable for hash tables and other data structures that need fast hashing with a reasonable
/// degree of collision resistance. Currently backed by [`foldhash`][foldhash].
///
/// [foldhash]: http://github.com/orlp/foldhash
pub type FastHasher = foldhash::quality::FoldHasher;

/// [`BuildHasher`][std::hash::BuildHasher] implementation for [`FastHasher`].
pub type FastBuildHasher = foldhash::quality::RandomState;
