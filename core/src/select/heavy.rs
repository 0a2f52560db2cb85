use crate::candidates::{KernelCapabilities, MatchIndexSet, SlotId};
use crate::matchers::DtypeMatcher;
use crate::select::NodeTensors;
use hwfmt_data::internal::*;

/// Score of a candidate format equal to the pinned heavy format.
pub const SCORE_PINNED: i64 = 2000;
/// Score of any other heavy format.
pub const SCORE_HEAVY: i64 = 200;
/// Score of the tensor's origin format, or of plain ND.
pub const SCORE_ORIGIN: i64 = 100;
pub const SCORE_OTHER: i64 = 1;

/// The slot whose layout a neighbour has pinned, and the layout itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, new)]
pub struct HeavyFormatContext {
    pub slot: SlotId,
    pub format: Format,
}

#[derive(Debug, new)]
pub struct HeavyFormatSelector<'a> {
    node: &'a NodeTensors,
    kernel: &'a KernelCapabilities,
    matcher: &'a dyn DtypeMatcher,
}

impl HeavyFormatSelector<'_> {
    pub fn select(&self, ctx: &HeavyFormatContext) -> Result<usize, ResolutionError> {
        let seeded = self.search_heavy_format_in_kernel(ctx)?;
        let survivors = self.match_dtype_for_all_input_and_output(&seeded)?;
        select_best(self.node, self.kernel, ctx.format, &survivors)
    }

    /// Every candidate laid out in the pinned format on the pinned slot.
    pub fn search_heavy_format_in_kernel(
        &self,
        ctx: &HeavyFormatContext,
    ) -> Result<MatchIndexSet, ResolutionError> {
        let list = self.kernel.slot(ctx.slot)?;
        let seeded: MatchIndexSet = list
            .formats()
            .iter()
            .enumerate()
            .filter(|(_, f)| **f == ctx.format)
            .map(|(ix, _)| ix)
            .collect();
        trace!("{} in {} seeds {}", ctx.format, ctx.slot, seeded);
        seeded.non_empty(|| format!("kernel has no {} candidate in {}", ctx.format, ctx.slot))
    }

    /// Narrows `set` slot after slot so that the surviving indices fit the
    /// dtype of every tensor of the node.
    pub fn match_dtype_for_all_input_and_output(
        &self,
        set: &MatchIndexSet,
    ) -> Result<MatchIndexSet, ResolutionError> {
        let mut set = set.clone();
        for (slot, tensor) in self.node.slots() {
            let list = self.kernel.slot(slot)?;
            set = self.matcher.narrow(list.dtypes(), tensor.dtype, &set).map_err(|e| match e {
                ResolutionError::NoMatch(why) => ResolutionError::NoMatch(format!("{slot}: {why}")),
                e => e,
            })?;
            trace!("After {} ({}): {}", slot, tensor.dtype, set);
        }
        Ok(set)
    }
}

fn format_score(candidate: Format, pinned: Format, origin: Format) -> i64 {
    if candidate == pinned {
        SCORE_PINNED
    } else if candidate.is_heavy() {
        SCORE_HEAVY
    } else if candidate == origin || candidate == Format::ND {
        SCORE_ORIGIN
    } else {
        SCORE_OTHER
    }
}

/// Sum over every tensor of the node of the score of candidate `ix`'s format.
pub fn score_candidate(
    node: &NodeTensors,
    kernel: &KernelCapabilities,
    pinned: Format,
    ix: usize,
) -> Result<i64, ResolutionError> {
    let mut score = 0i64;
    for (slot, tensor) in node.slots() {
        let Some(format) = kernel.slot(slot)?.formats().get(ix).copied() else {
            fail!(ConfigError, "candidate #{} out of range in {}", ix, slot);
        };
        score = checked_add(score, format_score(format, pinned, tensor.origin_format))?;
    }
    Ok(score)
}

/// The highest scoring candidate of `survivors`. On equal scores the
/// greatest index wins. Indices missing from some slot are skipped.
pub fn select_best(
    node: &NodeTensors,
    kernel: &KernelCapabilities,
    pinned: Format,
    survivors: &MatchIndexSet,
) -> Result<usize, ResolutionError> {
    let mut indices: TVec<usize> = survivors.iter().collect();
    indices.sort_unstable();
    let mut best: Option<(usize, i64)> = None;
    for ix in indices {
        if !kernel.declares(ix) {
            trace!("Candidate #{} is not declared by every slot", ix);
            continue;
        }
        let score = score_candidate(node, kernel, pinned, ix)?;
        trace!("Candidate #{} scores {}", ix, score);
        if best.is_none_or(|(_, top)| score >= top) {
            best = Some((ix, score));
        }
    }
    best.map(|(ix, _)| ix).ok_or_else(|| ResolutionError::NoMatch("no candidate to score".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::CandidateList;
    use crate::matchers::{PreciseDtypeMatcher, RiseDtypeMatcher};
    use crate::select::TensorDesc;
    use DataType::*;
    use Format::*;

    fn tensor(format: Format, dtype: DataType) -> TensorDesc {
        TensorDesc::new(format, NCHW, dtype, tvec!(1, 16, 8, 8))
    }

    fn conv_node() -> NodeTensors {
        let inputs = tvec!(tensor(NCHW, F16), tensor(NCHW, F16));
        NodeTensors::new("Conv2D".into(), inputs, tvec!(tensor(NCHW, F16)))
    }

    fn single_io(op: &str) -> NodeTensors {
        NodeTensors::new(op.into(), tvec!(tensor(NCHW, F16)), tvec!(tensor(NCHW, F16)))
    }

    fn conv_kernel() -> KernelCapabilities {
        let x = [(NC1HWC0, F16), (NC1HWC0, F32), (NCHW, F16), (NC1HWC0, F16)];
        let w = [(FractalZ, F16), (FractalZ, F32), (NCHW, F16), (NCHW, F16)];
        let y = [(NC1HWC0, F16), (NC1HWC0, F32), (NCHW, F16), (NCHW, F16)];
        let x = CandidateList::from_pairs(x);
        let w = CandidateList::from_pairs(w);
        let y = CandidateList::from_pairs(y);
        KernelCapabilities::new([x, w], [y])
    }

    #[test]
    fn seeds_on_pinned_slot() {
        crate::setup_test_logger();
        let (node, kernel) = (conv_node(), conv_kernel());
        let sel = HeavyFormatSelector::new(&node, &kernel, &PreciseDtypeMatcher);
        let ctx = HeavyFormatContext::new(SlotId::input(0), NC1HWC0);
        let seeded = sel.search_heavy_format_in_kernel(&ctx).unwrap();
        assert_eq!(seeded.as_slice(), &[0, 1, 3]);
        let ctx = HeavyFormatContext::new(SlotId::output(0), FractalNz);
        assert!(sel.search_heavy_format_in_kernel(&ctx).unwrap_err().is_recoverable());
    }

    #[test]
    fn dtype_narrowing_spans_every_slot() {
        let (node, kernel) = (conv_node(), conv_kernel());
        let sel = HeavyFormatSelector::new(&node, &kernel, &PreciseDtypeMatcher);
        let out = sel.match_dtype_for_all_input_and_output(&MatchIndexSet::all(4)).unwrap();
        assert_eq!(out.as_slice(), &[0, 2, 3]);
    }

    #[test]
    fn best_score_wins() {
        let (node, kernel) = (conv_node(), conv_kernel());
        let sel = HeavyFormatSelector::new(&node, &kernel, &PreciseDtypeMatcher);
        let ctx = HeavyFormatContext::new(SlotId::input(0), NC1HWC0);
        // #0: 2000 + 200 + 2000, #3: 2000 + 100 + 100
        assert_eq!(sel.select(&ctx).unwrap(), 0);
    }

    #[test]
    fn scoring_two_tensor_node() {
        let node = single_io("Conv2D");
        let x = CandidateList::from_pairs([(FractalZ, F16), (NC1HWC0, F16)]);
        let y = CandidateList::from_pairs([(NCHW, F16), (NCHW, F16)]);
        let kernel = KernelCapabilities::new([x], [y]);
        assert_eq!(score_candidate(&node, &kernel, FractalZ, 0).unwrap(), 2100);
        assert_eq!(score_candidate(&node, &kernel, FractalZ, 1).unwrap(), 300);
        let survivors: MatchIndexSet = [1, 0].into_iter().collect();
        assert_eq!(select_best(&node, &kernel, FractalZ, &survivors).unwrap(), 0);
    }

    #[test]
    fn ties_go_to_the_later_candidate() {
        let node = NodeTensors::new("Relu".into(), tvec!(tensor(NCHW, F16)), tvec!());
        let x = CandidateList::from_pairs([(NC1HWC0, F16), (NC1HWC0, F16), (NC1HWC0, F16)]);
        let kernel = KernelCapabilities::new([x], []);
        let sel = HeavyFormatSelector::new(&node, &kernel, &PreciseDtypeMatcher);
        let ctx = HeavyFormatContext::new(SlotId::input(0), NC1HWC0);
        assert_eq!(sel.select(&ctx).unwrap(), 2);
    }

    #[test]
    fn dtype_failure_names_the_slot() {
        let mut node = conv_node();
        node.outputs[0].dtype = I32;
        let (kernel, rise) = (conv_kernel(), RiseDtypeMatcher::default());
        let sel = HeavyFormatSelector::new(&node, &kernel, &rise);
        let ctx = HeavyFormatContext::new(SlotId::input(0), NC1HWC0);
        match sel.select(&ctx) {
            Err(ResolutionError::NoMatch(why)) => assert!(why.starts_with("output #0")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rise_policy_accepts_wider_kernel() {
        let node = single_io("Add");
        let x = CandidateList::from_pairs([(NC1HWC0, F32), (NC1HWC0, F64)]);
        let kernel = KernelCapabilities::new([x.clone()], [x]);
        let ctx = HeavyFormatContext::new(SlotId::input(0), NC1HWC0);
        let precise = HeavyFormatSelector::new(&node, &kernel, &PreciseDtypeMatcher);
        assert!(precise.select(&ctx).is_err());
        let matcher = RiseDtypeMatcher::default();
        let rise = HeavyFormatSelector::new(&node, &kernel, &matcher);
        assert_eq!(rise.select(&ctx).unwrap(), 0);
    }
}
