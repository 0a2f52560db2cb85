use crate::candidates::{KernelCapabilities, MatchIndexSet};
use crate::matchers::{DtypeMatcher, match_format};
use crate::select::NodeTensors;
use hwfmt_data::internal::*;

/// Selection when no neighbour pins a layout: every tensor keeps the
/// format it has, and the first surviving kernel variant is picked.
///
/// Slots are visited inputs first, then outputs. Each narrows a single
/// index set by format, then by dtype.
pub fn resolve_origin_candidate(
    node: &NodeTensors,
    kernel: &KernelCapabilities,
    matcher: &dyn DtypeMatcher,
) -> Result<usize, ResolutionError> {
    let mut set = MatchIndexSet::all(kernel.candidate_count());
    for (slot, tensor) in node.slots() {
        let list = kernel.slot(slot)?;
        set = match_format(list.formats(), tensor.format, tensor.origin_format, &set)?;
        set = matcher.narrow(list.dtypes(), tensor.dtype, &set)?;
        trace!("{} {}/{} leaves {}", slot, tensor.format, tensor.dtype, set);
    }
    let winner = set.first().ok_or_else(|| ResolutionError::NoMatch("node has no tensors".into()))?;
    debug!("{}: origin formats select candidate #{}", node.op_type, winner);
    Ok(winner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::CandidateList;
    use crate::matchers::{PreciseDtypeMatcher, RiseDtypeMatcher};
    use crate::select::TensorDesc;
    use DataType::*;
    use Format::*;

    #[test]
    fn weak_kernel_formats_follow_the_graph() {
        let t = TensorDesc::new(NHWC, NHWC, F16, tvec!(1, 8, 8, 3));
        let node = NodeTensors::new("Relu".into(), tvec!(t.clone()), tvec!(t));
        let l = CandidateList::from_pairs([(NC1HWC0, F16), (Any, F32), (Any, F16)]);
        let kernel = KernelCapabilities::new([l.clone()], [l]);
        assert_eq!(resolve_origin_candidate(&node, &kernel, &PreciseDtypeMatcher).unwrap(), 2);
        let rise = RiseDtypeMatcher::default();
        assert_eq!(resolve_origin_candidate(&node, &kernel, &rise).unwrap(), 2);
    }

    #[test]
    fn first_failing_slot_aborts() {
        let x = TensorDesc::new(NCHW, NCHW, F16, tvec!(1, 3, 8, 8));
        let y = TensorDesc::new(NHWC, NHWC, F16, tvec!(1, 8, 8, 3));
        let node = NodeTensors::new("Transpose".into(), tvec!(x), tvec!(y));
        let l = CandidateList::from_pairs([(NCHW, F16)]);
        let kernel = KernelCapabilities::new([l.clone()], [l]);
        let err = resolve_origin_candidate(&node, &kernel, &PreciseDtypeMatcher).unwrap_err();
        assert!(err.is_recoverable());
    }
}
