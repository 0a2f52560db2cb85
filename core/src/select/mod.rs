//! Per-node kernel candidate selection.

mod heavy;
mod origin;

pub use heavy::{
    HeavyFormatContext, HeavyFormatSelector, SCORE_HEAVY, SCORE_ORIGIN, SCORE_OTHER, SCORE_PINNED,
    score_candidate, select_best,
};
pub use origin::resolve_origin_candidate;

use crate::candidates::{KernelCapabilities, KernelCapabilityStore, SlotId};
use crate::matchers::DtypePolicy;
use hwfmt_data::internal::*;

/// What the selector needs to know about one tensor of the node.
#[derive(Clone, Debug, PartialEq, Eq, new)]
pub struct TensorDesc {
    /// Layout the tensor currently has.
    pub format: Format,
    /// Layout the tensor was declared with in the source graph.
    pub origin_format: Format,
    pub dtype: DataType,
    pub shape: TVec<i64>,
}

/// The tensors of one operator node.
#[derive(Clone, Debug, PartialEq, Eq, Default, new)]
pub struct NodeTensors {
    pub op_type: String,
    pub inputs: TVec<TensorDesc>,
    pub outputs: TVec<TensorDesc>,
}

impl NodeTensors {
    /// Inputs in index order, then outputs in index order.
    pub fn slots(&self) -> impl Iterator<Item = (SlotId, &TensorDesc)> {
        let inputs = self.inputs.iter().enumerate().map(|(ix, t)| (SlotId::input(ix), t));
        let outputs = self.outputs.iter().enumerate().map(|(ix, t)| (SlotId::output(ix), t));
        inputs.chain(outputs)
    }

    /// Collects from `store` the candidate lists of every slot the node uses.
    pub fn kernel_capabilities(
        &self,
        store: &dyn KernelCapabilityStore,
    ) -> Result<KernelCapabilities, ResolutionError> {
        let fetch = |slot: SlotId| {
            store.candidates(&self.op_type, slot).ok_or_else(|| {
                ResolutionError::ConfigError(format!("{} declares no {}", self.op_type, slot))
            })
        };
        let inputs = (0..self.inputs.len())
            .map(|ix| fetch(SlotId::input(ix)))
            .collect::<Result<TVec<_>, _>>()?;
        let outputs = (0..self.outputs.len())
            .map(|ix| fetch(SlotId::output(ix)))
            .collect::<Result<TVec<_>, _>>()?;
        Ok(KernelCapabilities::new(inputs, outputs))
    }
}

/// Picks the kernel variant of `node` compatible with the layout pinned by
/// `ctx`, returning its index in the kernel's candidate lists.
///
/// `NoMatch` means the kernel cannot honour the pinned layout with the
/// node's dtypes; the caller keeps the node's current layout.
pub fn resolve_kernel_candidate(
    node: &NodeTensors,
    store: &dyn KernelCapabilityStore,
    ctx: &HeavyFormatContext,
    policy: DtypePolicy,
) -> Result<usize, ResolutionError> {
    let kernel = node.kernel_capabilities(store)?;
    let matcher = policy.matcher();
    let winner = HeavyFormatSelector::new(node, &kernel, &*matcher).select(ctx);
    match &winner {
        Ok(ix) => {
            debug!("{}: {} in {} selects candidate #{}", node.op_type, ctx.format, ctx.slot, ix)
        }
        Err(e) => debug!("{}: {} in {} not selectable: {}", node.op_type, ctx.format, ctx.slot, e),
    }
    winner
}
