use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};

use wiener_recon_rs::image_pipeline::{
    ConstantImagePolicy, CropRect, DEFAULT_DELTA, ExecutionTarget, ReconstructionConfig,
    ReconstructionPipeline, ShapeAlignment, TiffCompression, jobs_for_directory,
};
use wiener_recon_rs::logger;

#[derive(Parser)]
#[command(name = "wiener-recon")]
#[command(about = "Reconstruct lensless camera captures by Wiener deconvolution with a measured PSF")]
#[command(version)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct one measurement.
    Single {
        /// PSF capture.
        psf: PathBuf,
        /// Measurement capture.
        measurement: PathBuf,
        /// Output image; the format follows the extension.
        output: PathBuf,
        #[command(flatten)]
        options: ReconstructionArgs,
    },

    /// Reconstruct every image in a directory against one PSF.
    Batch {
        /// PSF capture.
        psf: PathBuf,
        /// Directory searched recursively for measurements.
        measurements: PathBuf,
        /// Directory receiving one reconstruction per measurement.
        output_dir: PathBuf,
        /// Extension of the written files.
        #[arg(long, default_value = "png")]
        extension: String,
        #[command(flatten)]
        options: ReconstructionArgs,
    },
}

#[derive(Debug, Clone, Args)]
struct ReconstructionArgs {
    /// Wiener regularization, must be positive.
    #[arg(long, default_value_t = DEFAULT_DELTA)]
    delta: f64,

    /// Crop of the normalized reconstruction as y1,y2,x1,x2 (end exclusive).
    #[arg(long)]
    crop: Option<CropRect>,

    /// Where the filter runs.
    #[arg(long, value_enum, default_value_t = TargetArg::Cpu)]
    target: TargetArg,

    /// Handling of measurements whose shape differs from the PSF.
    #[arg(long = "align", value_enum, default_value_t = AlignArg::Strict)]
    alignment: AlignArg,

    /// Compression of TIFF output.
    #[arg(long, value_enum, default_value_t = CompressionArg::None)]
    tiff_compression: CompressionArg,

    /// Horizontal differencing predictor for compressed TIFF output.
    #[arg(long)]
    tiff_predictor: bool,

    /// Fail instead of writing a black image when the reconstruction is constant.
    #[arg(long)]
    reject_constant: bool,

    /// Log per-step timings.
    #[arg(long)]
    timings: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TargetArg {
    Cpu,
    Parallel,
}

impl From<TargetArg> for ExecutionTarget {
    fn from(value: TargetArg) -> Self {
        match value {
            TargetArg::Cpu => Self::Cpu,
            TargetArg::Parallel => Self::Parallel,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AlignArg {
    Strict,
    RampPad,
}

impl From<AlignArg> for ShapeAlignment {
    fn from(value: AlignArg) -> Self {
        match value {
            AlignArg::Strict => Self::Strict,
            AlignArg::RampPad => Self::RampPad,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompressionArg {
    None,
    Lzw,
    DeflateFast,
    Deflate,
    DeflateBest,
}

impl From<CompressionArg> for TiffCompression {
    fn from(value: CompressionArg) -> Self {
        match value {
            CompressionArg::None => Self::None,
            CompressionArg::Lzw => Self::Lzw,
            CompressionArg::DeflateFast => Self::DeflateFast,
            CompressionArg::Deflate => Self::DeflateBalanced,
            CompressionArg::DeflateBest => Self::DeflateBest,
        }
    }
}

impl ReconstructionArgs {
    fn to_config(&self) -> ReconstructionConfig {
        ReconstructionConfig::builder()
            .delta(self.delta)
            .crop(self.crop)
            .target(self.target.into())
            .alignment(self.alignment.into())
            .compression(self.tiff_compression.into())
            .predictor(self.tiff_predictor.then_some(2))
            .constant_policy(if self.reject_constant {
                ConstantImagePolicy::Reject
            } else {
                ConstantImagePolicy::Zeros
            })
            .build()
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(if cli.verbose { "debug" } else { "info" });

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Single {
            psf,
            measurement,
            output,
            options,
        } => {
            let pipeline = ReconstructionPipeline::new(options.to_config());
            info!(
                delta = pipeline.config().delta,
                target = %pipeline.config().target,
                "Reconstruction pipeline initialized"
            );

            let timings = pipeline
                .reconstruct_file_with_timings(&psf, &measurement, &output)
                .with_context(|| format!("reconstructing {}", measurement.display()))?;
            if options.timings {
                timings.log_summary();
            }
            info!("Wrote {}", output.display());
            Ok(())
        }
        Commands::Batch {
            psf,
            measurements,
            output_dir,
            extension,
            options,
        } => {
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("creating {}", output_dir.display()))?;
            let jobs = jobs_for_directory(&measurements, &output_dir, &extension)?;
            if jobs.is_empty() {
                warn!("No images found in {}", measurements.display());
                return Ok(());
            }

            let pipeline = ReconstructionPipeline::new(options.to_config());
            let results = pipeline.reconstruct_batch(&psf, &jobs)?;

            let mut failed = 0;
            for (job, result) in jobs.iter().zip(&results) {
                match result {
                    Ok(timings) if options.timings => {
                        info!("{}", job.measurement.display());
                        timings.log_summary();
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("{}: {}", job.measurement.display(), e);
                        failed += 1;
                    }
                }
            }

            if failed > 0 {
                bail!("{} of {} reconstructions failed", failed, jobs.len());
            }
            info!("Reconstructed {} image(s) into {}", jobs.len(), output_dir.display());
            Ok(())
        }
    }
}
