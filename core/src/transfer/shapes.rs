//! One shape builder per target format.
//!
//! Builders read [`AxisValues`] (and, for the fractal and RNN packings,
//! the flattened input shape). Any product or sum goes through the checked
//! `dim_*` helpers, so an unknown contributing axis gives an unknown
//! output dimension and an out of range one an `Overflow`.
use super::axis::{Axis, AxisValues};
use super::group::grouped_axes;
use super::{ImplKind, LSTM_GATES, NI};
use hwfmt_data::internal::*;

fn pick(axis: &AxisValues, axes: &[Axis]) -> TVec<i64> {
    axes.iter().map(|a| axis[*a]).collect()
}

/// Physical shape of a tensor laid out as `format`.
///
/// `old_shape` is returned for the formats that do not reshape.
pub fn build_shape(
    format: Format,
    axis: &AxisValues,
    nd: &[i64],
    old_shape: &[i64],
    impl_kind: ImplKind,
) -> Result<TVec<i64>, ResolutionError> {
    use Axis::*;
    match format {
        Format::NCHW => Ok(pick(axis, &[N, C, H, W])),
        Format::NHWC => Ok(pick(axis, &[N, H, W, C])),
        Format::HWCN => Ok(pick(axis, &[H, W, C, N])),
        Format::CHWN => Ok(pick(axis, &[C, H, W, N])),
        Format::NCDHW => Ok(pick(axis, &[N, C, D, H, W])),
        Format::NDHWC => Ok(pick(axis, &[N, D, H, W, C])),
        Format::DHWCN => Ok(pick(axis, &[D, H, W, C, N])),
        Format::DHWNC => Ok(pick(axis, &[D, H, W, N, C])),
        Format::NC1HWC0 | Format::NC1HWC0C04 => Ok(nc1hwc0(axis, impl_kind)),
        Format::C1HWNCoC0 => Ok(pick(axis, &[C1, H, W, N, Co, C0])),
        Format::NDC1HWC0 => Ok(pick(axis, &[N, D, C1, H, W, C0])),
        Format::FractalZ | Format::FractalZC04 => fractal_z(axis, nd),
        Format::FractalNz => Ok(fractal_nz(axis[C0], nd)),
        Format::FractalZ3D => fractal_z_3d(axis),
        Format::FractalZ3DTranspose => fractal_z_3d_transpose(axis),
        Format::FractalZnLstm => fractal_zn_lstm(axis),
        Format::FractalZnRnn => fractal_zn_rnn(axis, nd),
        Format::NdRnnBias => nd_rnn_bias(axis, nd),
        Format::ND | Format::NC | Format::CN | Format::NCL | Format::Any | Format::Null => {
            Ok(old_shape.iter().copied().collect())
        }
        Format::Unknown => fail!(InvalidFormat, "cannot lay out a tensor as {}", format),
    }
}

fn nc1hwc0(axis: &AxisValues, impl_kind: ImplKind) -> TVec<i64> {
    use Axis::*;
    if impl_kind.is_tiled() { pick(axis, &[N, C1, H, W, C0]) } else { pick(axis, &[N, C, H, W]) }
}

/// `(g*C1*H*W, N1, NI, C0)`, or `(K1, N1, NI, C0)` from a 2-D weight.
fn fractal_z(axis: &AxisValues, nd: &[i64]) -> Result<TVec<i64>, ResolutionError> {
    let c0 = axis[Axis::C0];
    if let &[k, n] = nd {
        return Ok(tvec!(dim_div_ceil(k, c0), dim_div_ceil(n, NI), NI, c0));
    }
    let g = grouped_axes(axis)?;
    let ghwc1 = dim_product(&[g.g, g.c1, axis[Axis::H], axis[Axis::W]])?;
    Ok(tvec!(ghwc1, dim_div_ceil(g.n, NI), NI, c0))
}

/// `(..., N1, M1, NI, C0)` from `(..., M, N)`.
fn fractal_nz(c0: i64, nd: &[i64]) -> TVec<i64> {
    match nd {
        [] => tvec!(1, 1, NI, c0),
        [n] => tvec!(dim_div_ceil(*n, c0), 1, NI, c0),
        [batch @ .., m, n] => {
            let mut shape: TVec<i64> = batch.iter().copied().collect();
            shape.extend([dim_div_ceil(*n, c0), dim_div_ceil(*m, NI), NI, c0]);
            shape
        }
    }
}

/// `(g*D*C1*H*W, N1, NI, C0)`.
fn fractal_z_3d(axis: &AxisValues) -> Result<TVec<i64>, ResolutionError> {
    let g = grouped_axes(axis)?;
    let gdc1hw = dim_product(&[g.g, axis[Axis::D], g.c1, axis[Axis::H], axis[Axis::W]])?;
    Ok(tvec!(gdc1hw, dim_div_ceil(g.n, NI), NI, axis[Axis::C0]))
}

/// `(g*D*H*W*ceil(N/C0), ceil(C/NI), NI, C0)`: output and input channels
/// swap roles.
fn fractal_z_3d_transpose(axis: &AxisValues) -> Result<TVec<i64>, ResolutionError> {
    let c0 = axis[Axis::C0];
    let g = grouped_axes(axis)?;
    let gdhwn1 =
        dim_product(&[g.g, axis[Axis::D], axis[Axis::H], axis[Axis::W], dim_div_ceil(g.n, c0)])?;
    Ok(tvec!(gdhwn1, dim_div_ceil(g.c, NI), NI, c0))
}

/// LSTM weights: N holds the four gates of the hidden size, C the input
/// size followed by the hidden size.
fn fractal_zn_lstm(axis: &AxisValues) -> Result<TVec<i64>, ResolutionError> {
    let (n, c) = (axis[Axis::N], axis[Axis::C]);
    if is_unknown(n) {
        return Ok(tvec!(UNKNOWN_DIM, UNKNOWN_DIM, NI, NI));
    }
    let hidden = n / LSTM_GATES;
    let second = dim_mul(LSTM_GATES, dim_div_ceil(hidden, NI))?;
    if is_unknown(c) {
        return Ok(tvec!(UNKNOWN_DIM, second, NI, NI));
    }
    let input = checked_sub(c, hidden)?;
    if input < 0 {
        fail!(InvalidShape, "LSTM weight has {} channels for hidden size {}", c, hidden);
    }
    let first = dim_add(dim_div_ceil(input, NI), dim_div_ceil(hidden, NI))?;
    Ok(tvec!(first, second, NI, NI))
}

/// Columns of an RNN weight or bias pack `n / hidden` gates, each padded
/// to whole NI tiles.
fn rnn_gate_columns(n: i64, hidden: i64) -> Result<i64, ResolutionError> {
    if is_unknown(n) || is_unknown(hidden) {
        return Ok(UNKNOWN_DIM);
    }
    if hidden <= 0 || n % hidden != 0 {
        fail!(InvalidShape, "{} columns do not split in gates of hidden size {}", n, hidden);
    }
    dim_mul(n / hidden, dim_div_ceil(hidden, NI))
}

/// `(..., K1, N1, NI, C0)` from an RNN weight `(..., K, N)`, where K is
/// the input size, the hidden (or state) size, or both stacked.
fn fractal_zn_rnn(axis: &AxisValues, nd: &[i64]) -> Result<TVec<i64>, ResolutionError> {
    let [batch @ .., k, n] = nd else {
        fail!(InvalidShape, "RNN weight must have rank 2 or 3, got {:?}", nd);
    };
    if batch.len() > 1 {
        fail!(InvalidShape, "RNN weight must have rank 2 or 3, got {:?}", nd);
    }
    let c0 = axis[Axis::C0];
    let (input, state) = (axis[Axis::InputSize], axis[Axis::StateSize]);
    let k1 = if is_unknown(*k) || is_unknown(input) || is_unknown(state) {
        UNKNOWN_DIM
    } else if *k == checked_add(input, state)? {
        dim_add(dim_div_ceil(input, c0), dim_div_ceil(state, c0))?
    } else if *k == input || *k == state {
        dim_div_ceil(*k, c0)
    } else {
        fail!(InvalidShape, "RNN rows {} fit neither input {} nor state {}", k, input, state);
    };
    let n1 = rnn_gate_columns(*n, axis[Axis::HiddenSize])?;
    let mut shape: TVec<i64> = batch.iter().copied().collect();
    shape.extend([k1, n1, NI, c0]);
    Ok(shape)
}

/// Bias `(..., N)` with every gate padded to whole NI tiles.
fn nd_rnn_bias(axis: &AxisValues, nd: &[i64]) -> Result<TVec<i64>, ResolutionError> {
    let [batch @ .., n] = nd else {
        fail!(InvalidShape, "RNN bias cannot be a scalar");
    };
    let padded = dim_mul(rnn_gate_columns(*n, axis[Axis::HiddenSize])?, NI)?;
    let mut shape: TVec<i64> = batch.iter().copied().collect();
    shape.push(padded);
    Ok(shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use Axis::*;

    fn nchw(n: i64, c: i64, h: i64, w: i64, c0: i64) -> AxisValues {
        AxisValues::default()
            .with(N, n)
            .with(C, c)
            .with(H, h)
            .with(W, w)
            .with(C0, c0)
            .with(Co, c0)
            .with(C1, dim_div_ceil(c, c0))
    }

    fn build(format: Format, axis: &AxisValues, nd: &[i64]) -> Result<TVec<i64>, ResolutionError> {
        build_shape(format, axis, nd, nd, ImplKind::Builtin)
    }

    #[test]
    fn reorderings() {
        let a = nchw(1, 2, 3, 4, 16);
        assert_eq!(&*build(Format::NHWC, &a, &[]).unwrap(), &[1, 3, 4, 2]);
        assert_eq!(&*build(Format::HWCN, &a, &[]).unwrap(), &[3, 4, 2, 1]);
        assert_eq!(&*build(Format::CHWN, &a, &[]).unwrap(), &[2, 3, 4, 1]);
        assert_eq!(&*build(Format::C1HWNCoC0, &a, &[]).unwrap(), &[1, 3, 4, 1, 16, 16]);
    }

    #[test]
    fn nc1hwc0_depends_on_impl() {
        let a = nchw(1, 40, 3, 4, 16);
        assert_eq!(&*build(Format::NC1HWC0, &a, &[]).unwrap(), &[1, 3, 3, 4, 16]);
        let cpu = build_shape(Format::NC1HWC0, &a, &[], &[], ImplKind::Cpu).unwrap();
        assert_eq!(&*cpu, &[1, 40, 3, 4]);
    }

    #[test]
    fn fractal_z_from_4d() {
        let a = nchw(32, 20, 3, 3, 16);
        assert_eq!(&*build(Format::FractalZ, &a, &[32, 20, 3, 3]).unwrap(), &[18, 2, 16, 16]);
    }

    #[test]
    fn fractal_z_from_2d() {
        let a = nchw(1, 1, 1, 1, 16);
        assert_eq!(&*build(Format::FractalZ, &a, &[33, 17]).unwrap(), &[3, 2, 16, 16]);
    }

    #[test]
    fn fractal_z_grouped() {
        let a = nchw(8, 8, 1, 1, 16).with(G, 4);
        assert_eq!(&*build(Format::FractalZ, &a, &[8, 8, 1, 1]).unwrap(), &[2, 1, 16, 16]);
    }

    #[test]
    fn fractal_z_unknown_spatial() {
        let a = nchw(32, 20, UNKNOWN_DIM, 3, 16);
        assert_eq!(&*build(Format::FractalZ, &a, &[]).unwrap(), &[UNKNOWN_DIM, 2, 16, 16]);
    }

    #[test]
    fn fractal_nz() {
        let a = nchw(1, 1, 1, 1, 16);
        assert_eq!(&*build(Format::FractalNz, &a, &[4, 33, 17]).unwrap(), &[4, 2, 3, 16, 16]);
        assert_eq!(&*build(Format::FractalNz, &a, &[17]).unwrap(), &[2, 1, 16, 16]);
        assert_eq!(
            &*build(Format::FractalNz, &a, &[UNKNOWN_DIM, 5]).unwrap(),
            &[1, UNKNOWN_DIM, 16, 16]
        );
    }

    #[test]
    fn fractal_z_3d() {
        let a = nchw(17, 20, 3, 3, 16).with(D, 2);
        assert_eq!(&*build(Format::FractalZ3D, &a, &[]).unwrap(), &[36, 2, 16, 16]);
        assert_eq!(&*build(Format::FractalZ3DTranspose, &a, &[]).unwrap(), &[36, 2, 16, 16]);
        let a = nchw(40, 3, 1, 1, 16).with(D, 1);
        assert_eq!(&*build(Format::FractalZ3DTranspose, &a, &[]).unwrap(), &[3, 1, 16, 16]);
    }

    #[test]
    fn lstm() {
        // hidden 32, input 20
        let a = nchw(128, 52, 1, 1, 16);
        assert_eq!(&*build(Format::FractalZnLstm, &a, &[]).unwrap(), &[4, 8, 16, 16]);
        let a = nchw(128, 10, 1, 1, 16);
        let err = build(Format::FractalZnLstm, &a, &[]);
        assert!(matches!(err, Err(ResolutionError::InvalidShape(_))));
    }

    fn rnn(input: i64, hidden: i64, state: i64) -> AxisValues {
        AxisValues::default()
            .with(C0, 16)
            .with(InputSize, input)
            .with(HiddenSize, hidden)
            .with(StateSize, state)
    }

    #[test]
    fn rnn_weight() {
        let a = rnn(20, 40, 40);
        assert_eq!(&*build(Format::FractalZnRnn, &a, &[60, 160]).unwrap(), &[5, 12, 16, 16]);
        assert_eq!(&*build(Format::FractalZnRnn, &a, &[2, 40, 160]).unwrap(), &[2, 3, 12, 16, 16]);
        assert!(build(Format::FractalZnRnn, &a, &[33, 160]).is_err());
        assert!(build(Format::FractalZnRnn, &a, &[20, 150]).is_err());
    }

    #[test]
    fn rnn_unknown_sizes() {
        let a = rnn(20, UNKNOWN_DIM, 40);
        let out = build(Format::FractalZnRnn, &a, &[60, 160]).unwrap();
        assert_eq!(&*out, &[5, UNKNOWN_DIM, 16, 16]);
        assert_eq!(&*build(Format::NdRnnBias, &a, &[160]).unwrap(), &[UNKNOWN_DIM]);
        let a = rnn(UNKNOWN_DIM, 40, 40);
        let out = build(Format::FractalZnRnn, &a, &[60, 160]).unwrap();
        assert_eq!(&*out, &[UNKNOWN_DIM, 12, 16, 16]);
        let a = rnn(20, 40, UNKNOWN_DIM);
        let out = build(Format::FractalZnRnn, &a, &[2, 40, 160]).unwrap();
        assert_eq!(&*out, &[2, UNKNOWN_DIM, 12, 16, 16]);
    }

    #[test]
    fn lstm_unknown_input_channels() {
        let a = nchw(128, UNKNOWN_DIM, 1, 1, 16);
        let out = build(Format::FractalZnLstm, &a, &[]).unwrap();
        assert_eq!(&*out, &[UNKNOWN_DIM, 8, 16, 16]);
        let a = nchw(UNKNOWN_DIM, 52, 1, 1, 16);
        let out = build(Format::FractalZnLstm, &a, &[]).unwrap();
        assert_eq!(&*out, &[UNKNOWN_DIM, UNKNOWN_DIM, 16, 16]);
    }

    #[test]
    fn rnn_bias() {
        let a = rnn(20, 40, 40);
        assert_eq!(&*build(Format::NdRnnBias, &a, &[160]).unwrap(), &[192]);
        assert_eq!(&*build(Format::NdRnnBias, &a, &[UNKNOWN_DIM]).unwrap(), &[UNKNOWN_DIM]);
    }

    #[test]
    fn overflow_is_reported() {
        let a = nchw(16, 16, i64::MAX / 2, 4, 16);
        assert!(matches!(build(Format::FractalZ, &a, &[]), Err(ResolutionError::Overflow(_))));
    }

    #[test]
    fn identity_formats() {
        let a = nchw(1, 2, 3, 4, 16);
        assert_eq!(&*build(Format::ND, &a, &[7, 9]).unwrap(), &[7, 9]);
        assert!(build(Format::Unknown, &a, &[]).is_err());
    }
}
