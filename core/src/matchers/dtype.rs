use crate::candidates::MatchIndexSet;
use hwfmt_data::internal::*;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Narrows a candidate set to the dtypes acceptable for `expected`.
pub trait DtypeMatcher: fmt::Debug + Send + Sync {
    fn narrow(
        &self,
        dtypes: &[DataType],
        expected: DataType,
        set: &MatchIndexSet,
    ) -> Result<MatchIndexSet, ResolutionError>;
}

/// Which dtype matcher a selection runs with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum DtypePolicy {
    #[default]
    Precise,
    Rise {
        forbidden: Option<DataType>,
    },
}

impl DtypePolicy {
    pub fn matcher(&self) -> Box<dyn DtypeMatcher> {
        match self {
            DtypePolicy::Precise => Box::new(PreciseDtypeMatcher),
            DtypePolicy::Rise { forbidden } => Box::new(RiseDtypeMatcher::new(*forbidden)),
        }
    }
}

fn check_expected(expected: DataType) -> Result<i64, ResolutionError> {
    expected
        .priority()
        .ok_or_else(|| ResolutionError::InvalidDataType(format!("cannot match against {expected}")))
}

/// Keeps exactly the candidates of the expected dtype.
#[derive(Debug, Copy, Clone, Default)]
pub struct PreciseDtypeMatcher;

impl DtypeMatcher for PreciseDtypeMatcher {
    fn narrow(
        &self,
        dtypes: &[DataType],
        expected: DataType,
        set: &MatchIndexSet,
    ) -> Result<MatchIndexSet, ResolutionError> {
        check_expected(expected)?;
        set.filter(|ix| dtypes.get(ix) == Some(&expected))
            .non_empty(|| format!("no candidate of dtype {expected} in {set}"))
    }
}

/// Raw priority gap of an exact match.
pub const EQUAL_PRIORITY_GAP: i64 = 0;
/// Candidates at this gap or further from the request are never accepted.
pub const RISE_WINDOW: i64 = 10;

/// Accepts the expected dtype, or failing that a wider one of the same
/// family, closest first.
#[derive(Debug, Copy, Clone, Default, new)]
pub struct RiseDtypeMatcher {
    /// Kept out of float requests even though it is wider.
    pub forbidden: Option<DataType>,
}

impl RiseDtypeMatcher {
    fn accepts_wider(&self, expected: DataType, candidate: DataType, gap: i64) -> bool {
        if gap <= EQUAL_PRIORITY_GAP || gap >= RISE_WINDOW {
            return false;
        }
        if expected != DataType::Bool && candidate.family() != expected.family() {
            return false;
        }
        if expected.is_float()
            && (Some(candidate) == self.forbidden || candidate == DataType::F64)
        {
            return false;
        }
        true
    }
}

impl DtypeMatcher for RiseDtypeMatcher {
    fn narrow(
        &self,
        dtypes: &[DataType],
        expected: DataType,
        set: &MatchIndexSet,
    ) -> Result<MatchIndexSet, ResolutionError> {
        let expected_priority = check_expected(expected)?;
        let mut exact: TVec<usize> = tvec!();
        // (gap, tie offset) -> index: closest first, declaration order on ties
        let mut wider: BTreeMap<(i64, usize), usize> = BTreeMap::new();
        let mut ties: HashMap<i64, usize> = HashMap::new();
        for ix in set.iter() {
            let Some(candidate) = dtypes.get(ix).copied() else {
                trace!("Dropping out of range candidate {}", ix);
                continue;
            };
            let Some(priority) = candidate.priority() else {
                continue;
            };
            let gap = checked_sub(priority, expected_priority)?;
            if gap == EQUAL_PRIORITY_GAP {
                if exact.is_empty() && !wider.is_empty() {
                    trace!("Exact {} at #{} discards {} wider", candidate, ix, wider.len());
                    wider.clear();
                }
                exact.push(ix);
            } else if exact.is_empty() && self.accepts_wider(expected, candidate, gap) {
                let offset = ties.entry(gap).or_default();
                wider.insert((gap, *offset), ix);
                *offset += 1;
            }
        }
        let accepted: MatchIndexSet = if exact.is_empty() {
            wider.into_values().collect()
        } else {
            exact.into_iter().collect()
        };
        trace!("Rise {} over {} keeps {}", expected, set, accepted);
        accepted.non_empty(|| format!("no candidate of dtype {expected} or wider in {set}"))
    }
}
