//! Narrowing stages over a kernel's candidate list.
//!
//! Each stage takes a [`MatchIndexSet`](crate::candidates::MatchIndexSet)
//! and returns a new, smaller or equal one. An empty result is reported as
//! `NoMatch` and the input set is left for the caller to fall back on.

mod dtype;
mod format;

pub use dtype::{DtypeMatcher, DtypePolicy, PreciseDtypeMatcher, RiseDtypeMatcher};
pub use format::{FALLBACK_EXCLUDED_FORMAT, find_suitable_format, match_format};
