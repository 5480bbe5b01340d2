use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconstructionError {
    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Failed to encode image: {0}")]
    EncodeError(String),

    #[error("PSF capture is degenerate (peak value {0})")]
    DegeneratePsf(f64),

    #[error(
        "Dimension mismatch: PSF is {psf_height}x{psf_width}, measurement is {height}x{width}"
    )]
    DimensionMismatch {
        psf_height: usize,
        psf_width: usize,
        height: usize,
        width: usize,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Crop rectangle y={y1}..{y2}, x={x1}..{x2} lies outside a {height}x{width} image")]
    InvalidCrop {
        y1: usize,
        y2: usize,
        x1: usize,
        x2: usize,
        height: usize,
        width: usize,
    },

    #[error("Reconstruction cannot be normalized: {0}")]
    DegenerateReconstruction(String),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ReconstructionError {
    /// True for the failures that come from reading, decoding, encoding or writing files.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::InputReadError(_)
                | Self::OutputWriteError(_)
                | Self::DecodeError(_)
                | Self::EncodeError(_)
                | Self::IoError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ReconstructionError>;
