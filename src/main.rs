//! skyframe - create, inspect and transform raw images through the tile cache.

use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skyframe::{
    config::{CacheConfig, Cli, Command, CreateConfig, InfoConfig, TransformConfig},
    with_pixel_type, BufferedImage, Image, ImageAccessor, ImageSource, Metadata, MirrorImage,
    PaddedImage, Pixel, RawFileSource, RecenterImage, ScaledImageSource, SharedImage,
    TileManager, WriteableBufferedImage, WriteableImage,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = cli.command.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Command::Create(config) => run_create(&config),
        Command::Info(config) => run_info(&config),
        Command::Transform(config) => run_transform(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "skyframe=debug"
    } else {
        "skyframe=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Reconfigure the process-wide cache from the command line.
fn configure_cache(config: &CacheConfig) -> Result<Arc<TileManager>, String> {
    let manager = TileManager::global();
    manager
        .set_options(config.tile_width, config.tile_height, config.max_memory())
        .map_err(|e| format!("Failed to configure tile cache: {}", e))?;
    Ok(manager)
}

// =============================================================================
// Create Command
// =============================================================================

fn run_create(config: &CreateConfig) -> Result<(), String> {
    let metadata = config.metadata()?;
    let source = RawFileSource::create(
        &config.path,
        config.width,
        config.height,
        config.pixel_type,
        metadata,
    )
    .map_err(|e| e.to_string())?;

    if let Some(value) = config.fill {
        with_pixel_type!(config.pixel_type, T => source.fill(T::from_f64(value)))
            .map_err(|e| e.to_string())?;
    }

    info!(
        path = %config.path.display(),
        width = config.width,
        height = config.height,
        pixel_type = %config.pixel_type,
        "Created image"
    );
    Ok(())
}

// =============================================================================
// Info Command
// =============================================================================

#[derive(Debug, Serialize)]
struct ImageReport {
    path: String,
    width: usize,
    height: usize,
    pixel_type: String,
    metadata: Metadata,
    min: Option<f64>,
    max: Option<f64>,
    mean: Option<f64>,
    cache_hit_rate: f64,
    cache_peak_memory: usize,
}

fn run_info(config: &InfoConfig) -> Result<(), String> {
    let manager = configure_cache(&config.cache)?;
    let source: Arc<dyn ImageSource> =
        Arc::new(RawFileSource::open(&config.path).map_err(|e| e.to_string())?);

    let (min, max, mean) = with_pixel_type!(source.pixel_type(), T => {
        let image = BufferedImage::<T>::with_manager(Arc::clone(&source), Arc::clone(&manager));
        pixel_statistics(&image)
    })
    .map_err(|e| e.to_string())?;

    let stats = manager.stats();
    let report = ImageReport {
        path: config.path.display().to_string(),
        width: source.width(),
        height: source.height(),
        pixel_type: source.pixel_type().to_string(),
        metadata: source.metadata(),
        min,
        max,
        mean,
        cache_hit_rate: stats.hit_rate(),
        cache_peak_memory: stats.peak_memory,
    };

    if config.json {
        let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{}", json);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Min, max and mean of every pixel, scanned row by row.
fn pixel_statistics<T: Pixel>(
    image: &dyn Image<T>,
) -> Result<(Option<f64>, Option<f64>, Option<f64>), skyframe::ImageError> {
    let mut accessor = ImageAccessor::new(image);
    let (mut min, mut max, mut sum) = (f64::INFINITY, f64::NEG_INFINITY, 0.0);
    for y in 0..image.height() {
        for x in 0..image.width() {
            let v = accessor.value(x, y)?.as_f64();
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
    }
    let count = image.width() * image.height();
    if count == 0 {
        return Ok((None, None, None));
    }
    Ok((Some(min), Some(max), Some(sum / count as f64)))
}

fn print_report(report: &ImageReport) {
    println!("{}", report.path);
    println!("  size:       {}x{}", report.width, report.height);
    println!("  pixel type: {}", report.pixel_type);
    if let (Some(min), Some(max), Some(mean)) = (report.min, report.max, report.mean) {
        println!("  min:        {}", min);
        println!("  max:        {}", max);
        println!("  mean:       {}", mean);
    }
    if !report.metadata.is_empty() {
        println!("  metadata:");
        for (key, entry) in &report.metadata {
            if entry.comment.is_empty() {
                println!("    {:<8} = {}", key, entry.value);
            } else {
                println!("    {:<8} = {} / {}", key, entry.value, entry.comment);
            }
        }
    }
    println!(
        "  cache:      {:.1}% hits, peak {} bytes",
        report.cache_hit_rate * 100.0,
        report.cache_peak_memory
    );
}

// =============================================================================
// Transform Command
// =============================================================================

fn run_transform(config: &TransformConfig) -> Result<(), String> {
    let manager = configure_cache(&config.cache)?;
    let input: Arc<dyn ImageSource> =
        Arc::new(RawFileSource::open(&config.input).map_err(|e| e.to_string())?);

    with_pixel_type!(input.pixel_type(), T => transform::<T>(config, &input, &manager))?;

    let stats = manager.stats();
    info!(
        input = %config.input.display(),
        output = %config.output.display(),
        hits = stats.hits,
        misses = stats.misses,
        evictions = stats.evictions,
        saves = stats.saves,
        "Transform complete"
    );
    Ok(())
}

fn transform<T: Pixel>(
    config: &TransformConfig,
    input: &Arc<dyn ImageSource>,
    manager: &Arc<TileManager>,
) -> Result<(), String> {
    let mut image: SharedImage<T> = Arc::new(BufferedImage::<T>::with_manager(
        Arc::clone(input),
        Arc::clone(manager),
    ));

    if config.mirror {
        image = Arc::new(MirrorImage::new(image));
    }
    if let Some(center) = config.recenter {
        image = Arc::new(RecenterImage::new(image, center));
    }
    if let Some(size) = config.pad {
        if size.width < image.width() || size.height < image.height() {
            return Err(format!(
                "cannot pad {}x{} image to {}x{}",
                image.width(),
                image.height(),
                size.width,
                size.height
            ));
        }
        let padding = config.padding.to_padding::<T>(config.pad_value);
        image = Arc::new(PaddedImage::new(image, size.width, size.height, padding));
    }
    if let Some(size) = config.scale {
        let scaled = ScaledImageSource::new(
            image.as_ref(),
            size.width,
            size.height,
            config.interpolation,
        )
        .map_err(|e| e.to_string())?;
        image = Arc::new(BufferedImage::<T>::with_manager(
            Arc::new(scaled),
            Arc::clone(manager),
        ));
    }
    info!(pipeline = %image.repr(), "Built transform");

    let output: Arc<dyn ImageSource> = Arc::new(
        RawFileSource::create(
            &config.output,
            image.width(),
            image.height(),
            T::TYPE,
            input.metadata(),
        )
        .map_err(|e| e.to_string())?,
    );

    write_bands(image.as_ref(), &output, manager)?;
    manager
        .flush()
        .map_err(|e| format!("Failed to write {}: {}", config.output.display(), e))
}

/// Copy `image` into `output` in bands one tile high, in parallel.
///
/// Bands never share a tile, so each worker writes through its own
/// [`WriteableBufferedImage`] without coordination.
fn write_bands<T: Pixel>(
    image: &dyn Image<T>,
    output: &Arc<dyn ImageSource>,
    manager: &Arc<TileManager>,
) -> Result<(), String> {
    let (width, height) = (image.width(), image.height());
    let band = manager.tile_height();
    let starts: Vec<usize> = (0..height).step_by(band).collect();

    starts.par_iter().try_for_each(|&y0| {
        let rows = band.min(height - y0);
        let chunk = image.chunk(0, y0, width, rows)?;
        let writer =
            WriteableBufferedImage::<T>::with_manager(Arc::clone(output), Arc::clone(manager));
        for (dy, row) in chunk.rows().enumerate() {
            for (x, &v) in row.iter().enumerate() {
                writer.set_value(x, y0 + dy, v)?;
            }
        }
        Ok::<(), skyframe::ImageError>(())
    })
    .map_err(|e| e.to_string())
}
