//! Physical shape of a tensor once laid out in a kernel's format.

mod axis;
mod group;
mod shapes;

pub use axis::{AXIS_COUNT, Axis, AxisResolver, AxisValues, PlainAxisResolver};
pub use group::{GroupedAxes, enlarge_value, grouped_axes};
pub use shapes::build_shape;

use hwfmt_data::internal::*;

/// Row tile of the fractal layouts.
pub const NI: i64 = 16;
/// Gates packed in an LSTM weight.
pub const LSTM_GATES: i64 = 4;

/// How the kernel consuming the tensor is implemented.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum ImplKind {
    #[default]
    Builtin,
    Custom,
    NonPersistentCustom,
    /// Host fallback, works on untiled data.
    Cpu,
}

impl ImplKind {
    pub fn is_tiled(&self) -> bool {
        !matches!(self, ImplKind::Cpu)
    }
}

/// Sizes of an RNN cell, supplied by the operator rather than read from
/// the weight shape.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, new)]
pub struct RnnSizes {
    pub input_size: i64,
    pub hidden_size: i64,
    /// Projected state size, if it differs from the hidden size.
    pub state_size: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    pub old_shape: TVec<i64>,
    pub old_format: Format,
    pub new_format: Format,
    pub dtype: DataType,
    pub impl_kind: ImplKind,
    pub group_count: i64,
    pub rnn: Option<RnnSizes>,
}

impl TransferRequest {
    pub fn new(
        old_shape: &[i64],
        old_format: Format,
        new_format: Format,
        dtype: DataType,
    ) -> TransferRequest {
        TransferRequest {
            old_shape: old_shape.iter().copied().collect(),
            old_format,
            new_format,
            dtype,
            impl_kind: ImplKind::default(),
            group_count: 1,
            rnn: None,
        }
    }

    pub fn with_impl_kind(self, impl_kind: ImplKind) -> TransferRequest {
        TransferRequest { impl_kind, ..self }
    }

    pub fn with_group_count(self, group_count: i64) -> TransferRequest {
        TransferRequest { group_count, ..self }
    }

    pub fn with_rnn(self, rnn: RnnSizes) -> TransferRequest {
        TransferRequest { rnn: Some(rnn), ..self }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferredShape {
    pub shape: TVec<i64>,
    /// Channel axis after group enlargement, when axes were resolved.
    pub channel: Option<i64>,
}

impl TransferredShape {
    fn identity(request: &TransferRequest) -> TransferredShape {
        TransferredShape { shape: request.old_shape.clone(), channel: None }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShapeTransferEngine<R: AxisResolver> {
    resolver: R,
}

impl<R: AxisResolver> ShapeTransferEngine<R> {
    pub fn new(resolver: R) -> ShapeTransferEngine<R> {
        ShapeTransferEngine { resolver }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Computes the shape of `request.old_shape` laid out as
    /// `request.new_format`.
    ///
    /// Unknown-rank shapes, and shapes whose format the resolver cannot
    /// decompose, come back unchanged. Fractal NZ is the exception to the
    /// latter: it only needs the flattened shape and is always built.
    pub fn transfer(&self, request: &TransferRequest) -> Result<TransferredShape, ResolutionError> {
        if is_unknown_rank(&request.old_shape) {
            return Ok(TransferredShape::identity(request));
        }
        for format in [request.old_format, request.new_format] {
            if !format.is_known() {
                fail!(InvalidFormat, "{:?} is not a known format", format);
            }
        }
        if !request.dtype.is_defined() {
            fail!(InvalidDataType, "cannot transfer shape of {} tensor", request.dtype);
        }
        let always = request.new_format == Format::FractalNz;
        if !always && !self.resolver.supports(request.old_format) {
            trace!("No axis rule for {}, keeping {:?}", request.old_format, request.old_shape);
            return Ok(TransferredShape::identity(request));
        }
        let c0 = c0_for(request.dtype, request.new_format);
        let (mut axis, nd, resolved) = match self.resolver.extract(
            &request.old_shape,
            request.old_format,
            c0,
            request.group_count,
        ) {
            Ok((axis, nd)) => (axis, nd, true),
            Err(e) if !always => {
                debug!("Keeping {:?} as {}: {}", request.old_shape, request.new_format, e);
                return Ok(TransferredShape::identity(request));
            }
            Err(e) => {
                trace!("Building {} from the raw shape: {}", request.new_format, e);
                (AxisValues::default(), request.old_shape.clone(), false)
            }
        };
        axis[Axis::C0] = c0;
        if request.new_format.is_rnn() {
            let Some(rnn) = request.rnn else {
                fail!(InvalidShape, "{} needs RNN input and hidden sizes", request.new_format);
            };
            axis[Axis::InputSize] = rnn.input_size;
            axis[Axis::HiddenSize] = rnn.hidden_size;
            axis[Axis::StateSize] = rnn.state_size.unwrap_or(rnn.hidden_size);
        }
        let shape = build_shape(
            request.new_format,
            &axis,
            &nd,
            &request.old_shape,
            request.impl_kind,
        )?;
        let channel = match request.new_format {
            _ if !resolved => None,
            Format::FractalZ
            | Format::FractalZC04
            | Format::FractalZ3D
            | Format::FractalZ3DTranspose => Some(grouped_axes(&axis)?.c),
            _ => Some(axis[Axis::C]),
        };
        trace!(
            "{:?} {} -> {:?} {} (C0 {})",
            request.old_shape, request.old_format, shape, request.new_format, c0
        );
        Ok(TransferredShape { shape, channel })
    }
}
