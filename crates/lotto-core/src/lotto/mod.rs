//! Result acquisition: source port, fetch coordinator with cache, normalizer.

pub mod fetcher;
pub mod normalize;
pub mod source;
