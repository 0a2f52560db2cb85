//! Channel enlargement for grouped convolution weights.
//!
//! Groups are merged `enlarge` at a time so that each merged group fills
//! whole C0 channel tiles and whole NI batch tiles.
use super::axis::{Axis, AxisValues};
use super::NI;
use hwfmt_data::internal::*;

/// Group, channel, batch and channel-tile axes after enlargement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupedAxes {
    pub g: i64,
    pub c: i64,
    pub n: i64,
    pub c1: i64,
}

/// `min(groups, lcm(lcm(c, c0) / c, lcm(n_per_group, NI) / n_per_group))`,
/// 0 when `c` or `n_per_group` is 0.
pub fn enlarge_value(
    c: i64,
    n_per_group: i64,
    c0: i64,
    groups: i64,
) -> Result<i64, ResolutionError> {
    if is_unknown(c) || is_unknown(n_per_group) {
        return Ok(UNKNOWN_DIM);
    }
    if c == 0 || n_per_group == 0 {
        return Ok(0);
    }
    let channel_factor = dim_lcm(c, c0)? / c;
    let batch_factor = dim_lcm(n_per_group, NI)? / n_per_group;
    Ok(groups.min(dim_lcm(channel_factor, batch_factor)?))
}

/// Applies group enlargement to `axis`. Ungrouped shapes, or shapes with
/// fewer output channels than groups, come back unchanged.
pub fn grouped_axes(axis: &AxisValues) -> Result<GroupedAxes, ResolutionError> {
    let (g, n, c, c0) = (axis[Axis::G], axis[Axis::N], axis[Axis::C], axis[Axis::C0]);
    let plain = GroupedAxes { g, c, n, c1: axis[Axis::C1] };
    if g <= 1 {
        return Ok(plain);
    }
    let unknown = GroupedAxes { g: UNKNOWN_DIM, c: UNKNOWN_DIM, n: UNKNOWN_DIM, c1: UNKNOWN_DIM };
    if is_unknown(n) {
        return Ok(unknown);
    }
    if n < g {
        return Ok(plain);
    }
    let n_per_group = n / g;
    let enlarge = enlarge_value(c, n_per_group, c0, g)?;
    debug!("Groups {} over N={} C={} C0={}: enlarge {}", g, n, c, c0, enlarge);
    if enlarge <= 0 {
        return Ok(unknown);
    }
    let c = checked_mul(c, enlarge)?;
    Ok(GroupedAxes {
        g: dim_div_ceil(g, enlarge),
        c,
        n: checked_mul(n_per_group, enlarge)?,
        c1: dim_div_ceil(c, c0),
    })
}
