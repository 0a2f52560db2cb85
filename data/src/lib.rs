#[macro_use]
mod macros;

/// A Smallvec instantiation with 4 embeddable values.
///
/// Used for shapes, candidate index sets and slot lists: most tensors
/// handled here are rank 4 or 5 and most kernels declare a handful of
/// candidates per slot.
pub type TVec<T> = smallvec::SmallVec<[T; 4]>;

/// Result type used at collaborator seams, where failures are soft.
pub type HwResult<T> = anyhow::Result<T>;

pub mod prelude {
    pub use crate::datum::{DataType, NumericFamily};
    pub use crate::dim::{UNKNOWN_DIM, UNKNOWN_RANK, is_unknown_rank};
    pub use crate::errors::ResolutionError;
    pub use crate::format::{Format, HEAVY_FORMATS, WEAK_FORMATS};
    pub use crate::{fail, tvec};
    pub use crate::{HwResult, TVec};
}

pub mod internal {
    pub use crate::datum::{C0_C04, C0_DEFAULT, c0_for};
    pub use crate::dim::{
        checked_add, checked_mul, checked_sub, dim_add, dim_div_ceil, dim_lcm, dim_mul, dim_product,
        is_unknown,
    };
    pub use crate::prelude::*;
    pub use smallvec as hwfmt_smallvec;
}

pub use anyhow;

pub mod datum;
pub mod dim;
pub mod errors;
pub mod format;
