// Sheet compositor: thumbnails into grid cells, then the footer

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::discover::SourceImage;
use crate::error::{SheetError, SheetResult};
use crate::footer::{draw_footer, FooterRenderer};
use crate::layout::{CellPlacement, SheetConfig};
use crate::metadata::MetadataRecord;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

// ============================================================================
// Thumbnails
// ============================================================================

/// A source image rotated to landscape and letterboxed to exactly one cell.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub image: RgbImage,
    pub rotated: bool,
}

/// Portrait sources are turned so every thumbnail is landscape.
pub fn needs_rotation(width: u32, height: u32) -> bool {
    height > width
}

/// Largest size with the source aspect ratio that fits the box. The
/// constraining axis matches the box exactly.
pub fn fit_within(src_w: u32, src_h: u32, box_w: u32, box_h: u32) -> (u32, u32) {
    let (sw, sh, bw, bh) = (src_w as u64, src_h as u64, box_w as u64, box_h as u64);
    if sw * bh >= sh * bw {
        let h = (sh * bw) as f64 / sw as f64;
        (box_w, (h.round() as u32).clamp(1, box_h))
    } else {
        let w = (sw * bh) as f64 / sh as f64;
        ((w.round() as u32).clamp(1, box_w), box_h)
    }
}

fn decode_error(source: &SourceImage, reason: impl ToString) -> SheetError {
    SheetError::Decode {
        path: source.path.clone(),
        reason: reason.to_string(),
    }
}

/// True when an end-of-image marker follows the last start-of-scan marker.
/// Entropy-coded data stuffs every 0xFF byte, so neither marker can appear
/// inside scan data.
pub fn jpeg_is_complete(bytes: &[u8]) -> bool {
    match bytes.windows(2).rposition(|w| w == [0xFF, 0xDA]) {
        Some(sos) => bytes[sos + 2..].windows(2).any(|w| w == [0xFF, 0xD9]),
        None => false,
    }
}

/// Decode a source file. Truncated JPEGs are rejected even though the
/// decoder would pad them out with gray.
pub fn load_source(source: &SourceImage) -> SheetResult<DynamicImage> {
    let bytes = std::fs::read(&source.path).map_err(|e| decode_error(source, e))?;
    let format = image::guess_format(&bytes)
        .or_else(|_| ImageFormat::from_path(&source.path))
        .map_err(|e| decode_error(source, e))?;

    if format == ImageFormat::Jpeg && !jpeg_is_complete(&bytes) {
        return Err(decode_error(source, "truncated JPEG: no end-of-image marker"));
    }

    image::load_from_memory_with_format(&bytes, format).map_err(|e| decode_error(source, e))
}

/// Rotate (if portrait), contain-fit and center on a white cell.
pub fn make_thumbnail(img: DynamicImage, cell_w: u32, cell_h: u32) -> Thumbnail {
    let rotated = needs_rotation(img.width(), img.height());
    let img = if rotated { img.rotate90() } else { img };

    let rgb = img.to_rgb8();
    let (w, h) = fit_within(rgb.width(), rgb.height(), cell_w, cell_h);
    let resized = imageops::resize(&rgb, w, h, FilterType::Lanczos3);

    let mut cell = RgbImage::from_pixel(cell_w, cell_h, WHITE);
    imageops::replace(
        &mut cell,
        &resized,
        ((cell_w - w) / 2) as i64,
        ((cell_h - h) / 2) as i64,
    );

    Thumbnail {
        image: cell,
        rotated,
    }
}

/// Decode one source and turn it into a thumbnail. Failures stay local to
/// this image.
pub fn generate_thumbnail(source: &SourceImage, cell_w: u32, cell_h: u32) -> SheetResult<Thumbnail> {
    let img = load_source(source)?;
    if img.width() == 0 || img.height() == 0 {
        return Err(decode_error(source, "image has no pixels"));
    }
    debug!(
        file = %source.displayed_filename,
        width = img.width(),
        height = img.height(),
        "decoded"
    );
    Ok(make_thumbnail(img, cell_w, cell_h))
}

// ============================================================================
// Composition
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedImage {
    pub index: usize,
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct CompositionReport {
    pub placed: Vec<CellPlacement>,
    pub skipped: Vec<SkippedImage>,
    /// Images beyond grid capacity, never decoded
    pub dropped: usize,
    pub footer_drawn: bool,
}

pub struct ContactSheet {
    pub image: RgbImage,
    pub report: CompositionReport,
}

enum Parallelism {
    Sequential,
    Global,
    Pool(ThreadPool),
}

/// Places thumbnails and the footer onto a fresh canvas. Thumbnail
/// generation may run in parallel; compositing is always in row-major order.
pub struct Compositor<'a> {
    config: &'a SheetConfig,
    footer: &'a FooterRenderer,
    parallelism: Parallelism,
}

impl<'a> Compositor<'a> {
    pub fn new(config: &'a SheetConfig, footer: &'a FooterRenderer) -> Self {
        Compositor {
            config,
            footer,
            parallelism: Parallelism::Global,
        }
    }

    /// `jobs == 1` decodes one image at a time, larger values use a
    /// dedicated pool of that size, 0 uses the rayon default.
    pub fn with_jobs(mut self, jobs: usize) -> SheetResult<Self> {
        self.parallelism = match jobs {
            0 => Parallelism::Global,
            1 => Parallelism::Sequential,
            n => Parallelism::Pool(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| SheetError::Configuration(format!("thread pool: {}", e)))?,
            ),
        };
        Ok(self)
    }

    fn thumbnails(&self, sources: &[SourceImage]) -> Vec<SheetResult<Thumbnail>> {
        let (cell_w, cell_h) = self.config.cell_size();
        let generate = |source: &SourceImage| generate_thumbnail(source, cell_w, cell_h);
        match &self.parallelism {
            Parallelism::Sequential => sources.iter().map(generate).collect(),
            Parallelism::Global => sources.par_iter().map(generate).collect(),
            Parallelism::Pool(pool) => pool.install(|| sources.par_iter().map(generate).collect()),
        }
    }

    pub fn compose(&self, sources: &[SourceImage], metadata: &MetadataRecord) -> SheetResult<ContactSheet> {
        if sources.is_empty() {
            return Err(SheetError::EmptyInput { dir: None });
        }

        let capacity = self.config.capacity();
        let used = &sources[..sources.len().min(capacity)];
        let mut report = CompositionReport {
            dropped: sources.len() - used.len(),
            ..Default::default()
        };
        if report.dropped > 0 {
            warn!(dropped = report.dropped, "grid full, extra images ignored");
        }

        let size = self.config.canvas_px();
        let mut canvas = RgbImage::from_pixel(size, size, WHITE);

        let thumbnails = self.thumbnails(used);
        for (placement, result) in self.config.cell_placements(used.len()).zip(thumbnails) {
            match result {
                Ok(thumb) => {
                    imageops::replace(
                        &mut canvas,
                        &thumb.image,
                        placement.origin_x as i64,
                        placement.origin_y as i64,
                    );
                    report.placed.push(placement);
                }
                Err(e) => {
                    warn!(cell = placement.index, "skipping image: {}", e);
                    let reason = match e {
                        SheetError::Decode { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    report.skipped.push(SkippedImage {
                        index: placement.index,
                        path: used[placement.index].path.clone(),
                        reason,
                    });
                }
            }
        }

        report.footer_drawn = draw_footer(&mut canvas, self.config, metadata, self.footer)?;

        info!(
            placed = report.placed.len(),
            skipped = report.skipped.len(),
            footer = report.footer_drawn,
            "sheet composed"
        );
        Ok(ContactSheet {
            image: canvas,
            report,
        })
    }
}
