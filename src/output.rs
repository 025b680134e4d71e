// JPEG output for the finished sheet

use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::RgbImage;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{SheetError, SheetResult};

/// Print artifact, not an intermediate
pub const JPEG_QUALITY: u8 = 95;

/// Encode at quality 95 with the sheet DPI recorded in the JFIF header.
pub fn encode_jpeg(image: &RgbImage, dpi: u32) -> SheetResult<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY);
    encoder.set_pixel_density(PixelDensity::dpi(dpi.min(u16::MAX as u32) as u16));
    encoder
        .encode_image(image)
        .map_err(|e| SheetError::Render(format!("JPEG encoding failed: {}", e)))?;
    Ok(bytes)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

fn write_bytes(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let partial = partial_path(path);
    let result = File::create(&partial)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&partial, path));
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

/// Encode and write the sheet. Nothing is left at `path` if writing fails.
pub fn write_sheet(image: &RgbImage, dpi: u32, path: &Path) -> SheetResult<()> {
    let bytes = encode_jpeg(image, dpi)?;
    write_bytes(path, &bytes).map_err(|source| SheetError::OutputWrite {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote sheet");
    Ok(())
}
