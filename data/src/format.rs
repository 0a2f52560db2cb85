//! Physical tensor layouts.
use std::fmt;

/// A closed set of physical memory layouts.
///
/// `Unknown` is the sentinel for values coming from outside the known set;
/// it is never a valid target or source of a shape transfer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Format {
    #[default]
    NCHW,
    NHWC,
    ND,
    NC,
    CN,
    NCL,
    HWCN,
    CHWN,
    NCDHW,
    NDHWC,
    DHWCN,
    DHWNC,
    NC1HWC0,
    NC1HWC0C04,
    C1HWNCoC0,
    NDC1HWC0,
    FractalZ,
    FractalZC04,
    FractalNz,
    FractalZ3D,
    FractalZ3DTranspose,
    FractalZnLstm,
    FractalZnRnn,
    NdRnnBias,
    /// Don't-care: the kernel accepts whatever the tensor's origin format is.
    Any,
    /// Don't-care, declared by kernels that leave the slot unconstrained.
    Null,
    Unknown,
}

/// Tiled layouts that are expensive to produce and pin their neighbours.
pub const HEAVY_FORMATS: &[Format] = &[
    Format::NC1HWC0,
    Format::NC1HWC0C04,
    Format::C1HWNCoC0,
    Format::NDC1HWC0,
    Format::FractalZ,
    Format::FractalZC04,
    Format::FractalNz,
    Format::FractalZ3D,
    Format::FractalZ3DTranspose,
    Format::FractalZnLstm,
    Format::FractalZnRnn,
    Format::NdRnnBias,
];

/// Layouts that defer to the tensor's origin format.
pub const WEAK_FORMATS: &[Format] = &[Format::Any, Format::Null];

const NAMES: &[(Format, &str)] = &[
    (Format::NCHW, "NCHW"),
    (Format::NHWC, "NHWC"),
    (Format::ND, "ND"),
    (Format::NC, "NC"),
    (Format::CN, "CN"),
    (Format::NCL, "NCL"),
    (Format::HWCN, "HWCN"),
    (Format::CHWN, "CHWN"),
    (Format::NCDHW, "NCDHW"),
    (Format::NDHWC, "NDHWC"),
    (Format::DHWCN, "DHWCN"),
    (Format::DHWNC, "DHWNC"),
    (Format::NC1HWC0, "NC1HWC0"),
    (Format::NC1HWC0C04, "NC1HWC0_C04"),
    (Format::C1HWNCoC0, "C1HWNCoC0"),
    (Format::NDC1HWC0, "NDC1HWC0"),
    (Format::FractalZ, "FRACTAL_Z"),
    (Format::FractalZC04, "FRACTAL_Z_C04"),
    (Format::FractalNz, "FRACTAL_NZ"),
    (Format::FractalZ3D, "FRACTAL_Z_3D"),
    (Format::FractalZ3DTranspose, "FRACTAL_Z_3D_TRANSPOSE"),
    (Format::FractalZnLstm, "FRACTAL_ZN_LSTM"),
    (Format::FractalZnRnn, "FRACTAL_ZN_RNN"),
    (Format::NdRnnBias, "ND_RNN_BIAS"),
    (Format::Any, "ALL"),
    (Format::Null, "NULL"),
];

impl Format {
    pub fn is_heavy(&self) -> bool {
        HEAVY_FORMATS.contains(self)
    }

    pub fn is_weak(&self) -> bool {
        WEAK_FORMATS.contains(self)
    }

    pub fn is_known(&self) -> bool {
        *self != Format::Unknown
    }

    /// Layouts tiled with a forced C0 of 4.
    pub fn is_c04(&self) -> bool {
        matches!(self, Format::NC1HWC0C04 | Format::FractalZC04)
    }

    pub fn is_3d(&self) -> bool {
        matches!(
            self,
            Format::NCDHW
                | Format::NDHWC
                | Format::DHWCN
                | Format::DHWNC
                | Format::NDC1HWC0
                | Format::FractalZ3D
                | Format::FractalZ3DTranspose
        )
    }

    pub fn is_rnn(&self) -> bool {
        matches!(self, Format::FractalZnRnn | Format::NdRnnBias)
    }

    pub fn name(&self) -> &'static str {
        NAMES.iter().find(|(f, _)| f == self).map(|(_, n)| *n).unwrap_or("UNKNOWN")
    }
}

impl fmt::Display for Format {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.name())
    }
}

impl std::str::FromStr for Format {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NAMES
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(s))
            .map(|(f, _)| *f)
            .ok_or_else(|| anyhow::anyhow!("Unknown format {}", s))
    }
}
