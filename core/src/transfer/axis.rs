//! Canonical axis decomposition of a logical shape.
use hwfmt_data::internal::*;
use std::ops::{Index, IndexMut};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Axis {
    N,
    C,
    H,
    W,
    C0,
    C1,
    D,
    G,
    Co,
    InputSize,
    HiddenSize,
    StateSize,
}

pub const AXIS_COUNT: usize = 12;

/// Size of every named axis. Axes a format does not carry are 1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AxisValues([i64; AXIS_COUNT]);

impl Default for AxisValues {
    fn default() -> AxisValues {
        AxisValues([1; AXIS_COUNT])
    }
}

impl Index<Axis> for AxisValues {
    type Output = i64;
    fn index(&self, axis: Axis) -> &i64 {
        &self.0[axis as usize]
    }
}

impl IndexMut<Axis> for AxisValues {
    fn index_mut(&mut self, axis: Axis) -> &mut i64 {
        &mut self.0[axis as usize]
    }
}

impl AxisValues {
    pub fn with(mut self, axis: Axis, value: i64) -> AxisValues {
        self[axis] = value;
        self
    }

    pub fn has_unknown(&self, axes: &[Axis]) -> bool {
        axes.iter().any(|a| is_unknown(self[*a]))
    }
}

/// Turns a shape in a logical format into [`AxisValues`], plus the
/// flattened shape the fractal and RNN packings work from.
pub trait AxisResolver {
    /// Whether `format` has an extraction rule at all.
    fn supports(&self, format: Format) -> bool;

    fn extract(
        &self,
        shape: &[i64],
        format: Format,
        c0: i64,
        group_count: i64,
    ) -> HwResult<(AxisValues, TVec<i64>)>;
}

impl<R: AxisResolver + ?Sized> AxisResolver for &R {
    fn supports(&self, format: Format) -> bool {
        (**self).supports(format)
    }

    fn extract(
        &self,
        shape: &[i64],
        format: Format,
        c0: i64,
        group_count: i64,
    ) -> HwResult<(AxisValues, TVec<i64>)> {
        (**self).extract(shape, format, c0, group_count)
    }
}

/// Extraction for the plain, untiled formats. The flattened shape is the
/// input shape itself.
#[derive(Debug, Copy, Clone, Default)]
pub struct PlainAxisResolver;

impl PlainAxisResolver {
    fn layout(format: Format) -> Option<&'static [Axis]> {
        use Axis::*;
        let axes: &'static [Axis] = match format {
            Format::NCHW => &[N, C, H, W],
            Format::NHWC => &[N, H, W, C],
            Format::HWCN => &[H, W, C, N],
            Format::CHWN => &[C, H, W, N],
            Format::NCDHW => &[N, C, D, H, W],
            Format::NDHWC => &[N, D, H, W, C],
            Format::DHWCN => &[D, H, W, C, N],
            Format::DHWNC => &[D, H, W, N, C],
            Format::NC => &[N, C],
            Format::CN => &[C, N],
            Format::NCL => &[N, C, W],
            Format::ND => &[],
            _ => return None,
        };
        Some(axes)
    }
}

impl AxisResolver for PlainAxisResolver {
    fn supports(&self, format: Format) -> bool {
        Self::layout(format).is_some()
    }

    fn extract(
        &self,
        shape: &[i64],
        format: Format,
        c0: i64,
        group_count: i64,
    ) -> HwResult<(AxisValues, TVec<i64>)> {
        let Some(layout) = Self::layout(format) else {
            anyhow::bail!("No axis rule for {}", format)
        };
        if !layout.is_empty() && layout.len() != shape.len() {
            anyhow::bail!("{} expects rank {}, got {:?}", format, layout.len(), shape)
        }
        let mut axis = AxisValues::default();
        for (a, d) in layout.iter().zip(shape.iter()) {
            axis[*a] = *d;
        }
        axis[Axis::C0] = c0;
        axis[Axis::Co] = c0;
        axis[Axis::C1] = dim_div_ceil(axis[Axis::C], c0);
        axis[Axis::G] = group_count.max(1);
        Ok((axis, shape.iter().copied().collect()))
    }
}
