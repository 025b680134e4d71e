use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Invalid sheet geometry: {0}")]
    Configuration(String),
    #[error("No .jpg/.jpeg images found{}", in_dir(.dir))]
    EmptyInput { dir: Option<PathBuf> },
    #[error("Failed to decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },
    #[error("Failed to write {}: {source}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read metadata: {0}")]
    Metadata(String),
    #[error("Failed to render footer: {0}")]
    Render(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn in_dir(dir: &Option<PathBuf>) -> String {
    dir.as_ref()
        .map(|d| format!(" in {}", d.display()))
        .unwrap_or_default()
}

pub type SheetResult<T> = Result<T, SheetError>;
