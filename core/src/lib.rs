//! # hwfmt
//!
//! Format and data type resolution for kernels of tiled accelerators.
//!
//! For one operator node, [`select`] picks among the (format, dtype)
//! variants a kernel implementation declares the one that fits the
//! node's tensors and the layout pinned by its neighbours. [`transfer`]
//! then computes the physical shape of a tensor once it is laid out in
//! the chosen format.
//!
//! ```
//! use hwfmt_core::internal::*;
//!
//! let engine = ShapeTransferEngine::new(PlainAxisResolver);
//! let request =
//!     TransferRequest::new(&[1, 16, 1, 4], Format::NCHW, Format::NC1HWC0, DataType::F16);
//! let out = engine.transfer(&request).unwrap();
//! assert_eq!(&*out.shape, &[1, 1, 1, 4, 16]);
//! ```
//!
//! Nothing here keeps state between calls: every entry point is a pure
//! function of its arguments and the collaborators it is handed.

#[macro_use]
extern crate derive_new;
#[macro_use]
pub extern crate log;

pub mod candidates;
pub mod matchers;
pub mod select;
pub mod transfer;

pub use hwfmt_data;

pub mod prelude {
    pub use crate::candidates::{CandidateList, KernelCapabilityStore, MatchIndexSet, SlotId};
    pub use crate::select::{HeavyFormatContext, NodeTensors, TensorDesc, resolve_kernel_candidate};
    pub use crate::transfer::{ShapeTransferEngine, TransferRequest, TransferredShape};
    pub use hwfmt_data::prelude::*;
}

pub mod internal {
    pub use crate::candidates::*;
    pub use crate::matchers::*;
    pub use crate::prelude::*;
    pub use crate::select::*;
    pub use crate::transfer::*;
    pub use hwfmt_data::internal::*;
}

#[cfg(test)]
#[allow(dead_code)]
fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("HWFMT_LOG").is_test(true).try_init();
}
