//! Kernel candidate tables and the index sets that narrow them.
use hwfmt_data::internal::*;
use itertools::Itertools;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotKind {
    Input,
    Output,
}

/// One input or output position of an operator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, new)]
pub struct SlotId {
    pub kind: SlotKind,
    pub index: usize,
}

impl SlotId {
    pub fn input(index: usize) -> SlotId {
        SlotId::new(SlotKind::Input, index)
    }

    pub fn output(index: usize) -> SlotId {
        SlotId::new(SlotKind::Output, index)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            SlotKind::Input => write!(f, "input #{}", self.index),
            SlotKind::Output => write!(f, "output #{}", self.index),
        }
    }
}

/// The (format, dtype) variants a kernel supports on one slot.
///
/// Candidate `i` is `formats[i]` together with `dtypes[i]`; the same index
/// designates the same kernel variant on every slot of the operator.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CandidateList {
    formats: TVec<Format>,
    dtypes: TVec<DataType>,
}

impl CandidateList {
    pub fn new(
        formats: impl IntoIterator<Item = Format>,
        dtypes: impl IntoIterator<Item = DataType>,
    ) -> Result<CandidateList, ResolutionError> {
        let formats: TVec<Format> = formats.into_iter().collect();
        let dtypes: TVec<DataType> = dtypes.into_iter().collect();
        if formats.len() != dtypes.len() {
            fail!(
                ConfigError,
                "{} formats declared against {} dtypes",
                formats.len(),
                dtypes.len()
            );
        }
        Ok(CandidateList { formats, dtypes })
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (Format, DataType)>) -> CandidateList {
        let (formats, dtypes) = pairs.into_iter().unzip();
        CandidateList { formats, dtypes }
    }

    pub fn formats(&self) -> &[Format] {
        &self.formats
    }

    pub fn dtypes(&self) -> &[DataType] {
        &self.dtypes
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    pub fn get(&self, ix: usize) -> Option<(Format, DataType)> {
        Some((*self.formats.get(ix)?, *self.dtypes.get(ix)?))
    }
}

impl fmt::Display for CandidateList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}]",
            self.formats.iter().zip(self.dtypes.iter()).map(|(f, d)| format!("{f}/{d}")).join(", ")
        )
    }
}

/// An ordered set of candidate indices.
///
/// Matching stages only ever remove indices; the order in which survivors
/// appear is meaningful to later stages.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct MatchIndexSet(TVec<usize>);

impl MatchIndexSet {
    /// Every index of a candidate list of length `len`, in declaration order.
    pub fn all(len: usize) -> MatchIndexSet {
        MatchIndexSet((0..len).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    pub fn first(&self) -> Option<usize> {
        self.0.first().copied()
    }

    pub fn contains(&self, ix: usize) -> bool {
        self.0.contains(&ix)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// A new set holding the indices accepted by `keep`, order preserved.
    pub fn filter(&self, mut keep: impl FnMut(usize) -> bool) -> MatchIndexSet {
        MatchIndexSet(self.iter().filter(|ix| keep(*ix)).collect())
    }

    pub fn is_subset_of(&self, other: &MatchIndexSet) -> bool {
        self.iter().all(|ix| other.contains(ix))
    }

    /// Fails with `NoMatch` when the set is empty.
    pub fn non_empty(
        self,
        what: impl FnOnce() -> String,
    ) -> Result<MatchIndexSet, ResolutionError> {
        if self.is_empty() { Err(ResolutionError::NoMatch(what())) } else { Ok(self) }
    }
}

impl FromIterator<usize> for MatchIndexSet {
    /// Duplicates are dropped, the first occurrence keeps its position.
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        MatchIndexSet(iter.into_iter().unique().collect())
    }
}

impl fmt::Display for MatchIndexSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{{}}}", self.0.iter().join(", "))
    }
}

/// Candidate lists of every slot of one kernel.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct KernelCapabilities {
    pub inputs: TVec<CandidateList>,
    pub outputs: TVec<CandidateList>,
}

impl KernelCapabilities {
    /// Slots may declare different numbers of variants: an index missing
    /// from any slot is never selected.
    pub fn new(
        inputs: impl IntoIterator<Item = CandidateList>,
        outputs: impl IntoIterator<Item = CandidateList>,
    ) -> KernelCapabilities {
        KernelCapabilities {
            inputs: inputs.into_iter().collect(),
            outputs: outputs.into_iter().collect(),
        }
    }

    pub fn slot(&self, slot: SlotId) -> Result<&CandidateList, ResolutionError> {
        let lists = match slot.kind {
            SlotKind::Input => &self.inputs,
            SlotKind::Output => &self.outputs,
        };
        lists
            .get(slot.index)
            .ok_or_else(|| ResolutionError::ConfigError(format!("kernel declares no {slot}")))
    }

    /// Inputs in index order, then outputs in index order.
    pub fn slots(&self) -> impl Iterator<Item = (SlotId, &CandidateList)> {
        let inputs = self.inputs.iter().enumerate().map(|(ix, l)| (SlotId::input(ix), l));
        let outputs = self.outputs.iter().enumerate().map(|(ix, l)| (SlotId::output(ix), l));
        inputs.chain(outputs)
    }

    /// Number of kernel variants, as declared by the longest slot.
    pub fn candidate_count(&self) -> usize {
        self.slots().map(|(_, l)| l.len()).max().unwrap_or(0)
    }

    /// Whether every slot declares variant `ix`.
    pub fn declares(&self, ix: usize) -> bool {
        self.slots().all(|(_, l)| ix < l.len())
    }
}

/// Source of the per-slot candidate lists of an operator type.
pub trait KernelCapabilityStore {
    fn candidates(&self, op_type: &str, slot: SlotId) -> Option<CandidateList>;
}

impl<S: KernelCapabilityStore + ?Sized> KernelCapabilityStore for &S {
    fn candidates(&self, op_type: &str, slot: SlotId) -> Option<CandidateList> {
        (**self).candidates(op_type, slot)
    }
}

/// In-memory store keyed by operator type.
#[derive(Clone, Debug, Default)]
pub struct KernelRegistry {
    kernels: HashMap<String, KernelCapabilities>,
}

impl KernelRegistry {
    pub fn register(&mut self, op_type: impl Into<String>, caps: KernelCapabilities) {
        let op_type = op_type.into();
        trace!("Registering {} with {} candidates", op_type, caps.candidate_count());
        self.kernels.insert(op_type, caps);
    }

    pub fn kernel(&self, op_type: &str) -> Option<&KernelCapabilities> {
        self.kernels.get(op_type)
    }
}

impl KernelCapabilityStore for KernelRegistry {
    fn candidates(&self, op_type: &str, slot: SlotId) -> Option<CandidateList> {
        self.kernel(op_type)?.slot(slot).ok().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Format::*;

    #[test]
    fn mismatched_lengths_are_a_config_error() {
        let err = CandidateList::new([NCHW, NC1HWC0], [DataType::F16]).unwrap_err();
        assert!(matches!(err, ResolutionError::ConfigError(_)));
    }

    #[test]
    fn slots_may_declare_different_counts() {
        let a = CandidateList::from_pairs([(NCHW, DataType::F16), (NC1HWC0, DataType::F16)]);
        let b = CandidateList::from_pairs([(NCHW, DataType::F16)]);
        let caps = KernelCapabilities::new([a.clone()], [b]);
        assert_eq!(caps.candidate_count(), 2);
        assert!(caps.declares(0));
        assert!(!caps.declares(1));
        assert!(KernelCapabilities::new([a.clone()], [a]).declares(1));
    }

    #[test]
    fn slots_iterate_inputs_then_outputs() {
        let l = CandidateList::from_pairs([(ND, DataType::F32)]);
        let caps = KernelCapabilities::new([l.clone(), l.clone()], [l]);
        let order: Vec<SlotId> = caps.slots().map(|(s, _)| s).collect();
        assert_eq!(order, vec![SlotId::input(0), SlotId::input(1), SlotId::output(0)]);
    }

    #[test]
    fn index_set_keeps_first_occurrence() {
        let set: MatchIndexSet = [3, 1, 3, 0, 1].into_iter().collect();
        assert_eq!(set.as_slice(), &[3, 1, 0]);
        assert!(set.filter(|ix| ix != 1).is_subset_of(&set));
    }

    #[test]
    fn registry_serves_candidates() {
        let l = CandidateList::from_pairs([(FractalZ, DataType::F16), (NCHW, DataType::F32)]);
        let mut reg = KernelRegistry::default();
        reg.register("Conv2D", KernelCapabilities::new([l.clone()], [l.clone()]));
        assert_eq!(reg.candidates("Conv2D", SlotId::output(0)), Some(l));
        assert_eq!(reg.candidates("Conv2D", SlotId::input(1)), None);
        assert_eq!(reg.candidates("MatMul", SlotId::input(0)), None);
    }
}
