//! Reconstruction configuration types

use crate::image_pipeline::deconvolution::ExecutionTarget;
use crate::image_pipeline::export::types::{
    ConstantImagePolicy, CropRect, OutputFormat, TiffCompression,
};

/// Regularization used when none is configured. Suitable deltas span several
/// orders of magnitude depending on sensor noise and PSF conditioning.
pub const DEFAULT_DELTA: f64 = 8.0e4;

/// How a measurement whose shape differs from the PSF is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeAlignment {
    /// Shapes must already match
    #[default]
    Strict,
    /// A smaller measurement is centered and ramp-padded to the PSF shape
    RampPad,
}

/// Configuration for PSF + measurement to reconstruction
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionConfig {
    /// Wiener regularization, must be finite and > 0
    pub delta: f64,
    /// Where the filter runs
    pub target: ExecutionTarget,
    /// Shape alignment between measurement and PSF
    pub alignment: ShapeAlignment,
    /// Optional crop applied after normalization
    pub crop: Option<CropRect>,
    /// Handling of constant reconstructions
    pub constant_policy: ConstantImagePolicy,
    /// Output format; inferred from the output extension when `None`
    pub output_format: Option<OutputFormat>,
    /// Compression for TIFF output
    pub compression: TiffCompression,
    /// Predictor for TIFF compression (2 for horizontal differencing)
    pub predictor: Option<u16>,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            delta: DEFAULT_DELTA,
            target: ExecutionTarget::Cpu,
            alignment: ShapeAlignment::Strict,
            crop: None,
            constant_policy: ConstantImagePolicy::Zeros,
            output_format: None,
            compression: TiffCompression::None,
            predictor: None,
        }
    }
}

impl ReconstructionConfig {
    pub fn builder() -> ReconstructionConfigBuilder {
        ReconstructionConfigBuilder::default()
    }
}

/// Builder for ReconstructionConfig
#[derive(Default)]
pub struct ReconstructionConfigBuilder {
    delta: Option<f64>,
    target: Option<ExecutionTarget>,
    alignment: Option<ShapeAlignment>,
    crop: Option<Option<CropRect>>,
    constant_policy: Option<ConstantImagePolicy>,
    output_format: Option<Option<OutputFormat>>,
    compression: Option<TiffCompression>,
    predictor: Option<Option<u16>>,
}

impl ReconstructionConfigBuilder {
    pub fn delta(mut self, delta: f64) -> Self {
        self.delta = Some(delta);
        self
    }

    pub fn target(mut self, target: ExecutionTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn alignment(mut self, alignment: ShapeAlignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn crop(mut self, crop: Option<CropRect>) -> Self {
        self.crop = Some(crop);
        self
    }

    pub fn constant_policy(mut self, policy: ConstantImagePolicy) -> Self {
        self.constant_policy = Some(policy);
        self
    }

    pub fn output_format(mut self, format: Option<OutputFormat>) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn predictor(mut self, predictor: Option<u16>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn build(self) -> ReconstructionConfig {
        let default = ReconstructionConfig::default();
        ReconstructionConfig {
            delta: self.delta.unwrap_or(default.delta),
            target: self.target.unwrap_or(default.target),
            alignment: self.alignment.unwrap_or(default.alignment),
            crop: self.crop.unwrap_or(default.crop),
            constant_policy: self.constant_policy.unwrap_or(default.constant_policy),
            output_format: self.output_format.unwrap_or(default.output_format),
            compression: self.compression.unwrap_or(default.compression),
            predictor: self.predictor.unwrap_or(default.predictor),
        }
    }
}
