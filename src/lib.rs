// contact-sheet: 6x6 photo index sheets with a metadata footer

pub mod compositor;
pub mod discover;
pub mod error;
pub mod footer;
pub mod layout;
pub mod metadata;
pub mod output;

use std::path::{Path, PathBuf};
use tracing::info;

pub use compositor::{CompositionReport, Compositor, ContactSheet, SkippedImage};
pub use discover::{discover_images, SourceImage};
pub use error::{SheetError, SheetResult};
pub use footer::FooterRenderer;
pub use layout::{CellPlacement, GridSpec, PhysicalSheetSpec, SheetConfig};
pub use metadata::MetadataRecord;

/// Everything one run needs besides the fixed geometry.
#[derive(Debug, Clone)]
pub struct SheetRequest {
    pub input_dir: PathBuf,
    pub output: PathBuf,
    pub metadata: MetadataRecord,
    /// Thumbnail workers, 0 for the rayon default
    pub jobs: usize,
    pub font: Option<PathBuf>,
}

/// Discover, compose and write one sheet. Empty input and bad geometry fail
/// before any image is decoded.
pub fn generate(config: &SheetConfig, request: &SheetRequest) -> SheetResult<CompositionReport> {
    let images = discover_images(&request.input_dir, config.capacity())?;
    info!(count = images.len(), dir = %request.input_dir.display(), "composing sheet");

    let footer = FooterRenderer::new(request.font.as_deref())?;
    let sheet = Compositor::new(config, &footer)
        .with_jobs(request.jobs)?
        .compose(&images, &request.metadata)?;

    write_output(config, &sheet, &request.output)?;
    Ok(sheet.report)
}

pub fn write_output(config: &SheetConfig, sheet: &ContactSheet, path: &Path) -> SheetResult<()> {
    output::write_sheet(&sheet.image, config.sheet().dpi, path)
}
