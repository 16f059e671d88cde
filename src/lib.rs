//! Scanned Page Gallery Library
//!
//! Core logic for a fixed gallery of scanned pages. Shared between CLI and WASM targets.
//!
//! The catalog is derived from a naming rule; the exporter binds every page
//! image into one PDF, one image per page, scaled to fit inside uniform margins.
//! Pages whose image cannot be loaded are replaced by a line of text so the
//! output always has one page per catalog entry.

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub mod app;
pub mod catalog;
pub mod compress;
pub mod document;
pub mod export;
pub mod layout;
pub mod raster;
pub mod trigger;
pub mod viewer;

pub use app::Gallery;
pub use catalog::{Catalog, CatalogConfig, PageEntry};
pub use compress::{compress_image, CompressOptions, CompressSummary, CompressedImage};
pub use export::{
    AssetSource, CancelToken, ExportJob, ExportReport, ExportStatus, Exporter, MemoryDelivery,
    MemorySource, OutputDelivery, PageOutcome, ProgressEvent, ProgressSink,
};
pub use layout::{PageGeometry, Placement};

use std::time::Duration;

/// Options for PDF export
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Page size and margin, in millimetres
    pub geometry: PageGeometry,
    /// Pause between pages so a long export does not starve the host
    pub inter_page_pause: Duration,
    /// Compress PDF streams (reduces file size)
    pub compress_streams: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            geometry: PageGeometry::default(),
            inter_page_pause: Duration::from_millis(10),
            compress_streams: true,
        }
    }
}

/// Why a single page asset could not be used
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Failed to load image: {0}")]
    Missing(String),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode {path}: {message}")]
    Decode { path: String, message: String },
}

/// Errors that abort a whole export run
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Catalog has no pages")]
    EmptyCatalog,
    #[error("Margins leave no room on the page: {0:?}")]
    InvalidGeometry(PageGeometry),
    #[error("An export is already running")]
    AlreadyRunning,
    #[error("Export cancelled after {completed} of {total} pages")]
    Cancelled { completed: usize, total: usize },
    #[error("Failed to build PDF: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("Failed to deliver {filename}: {message}")]
    Delivery { filename: String, message: String },
}

/// Errors from asset compression
#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    #[error("Quality must be between 1 and 100")]
    InvalidQuality,
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode JPEG: {0}")]
    Encode(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(not(target_arch = "wasm32"))]
pub mod file_ops {
    use super::*;
    use crate::compress::{format_kb, CompressSummary};
    use std::fs;
    use std::path::{Path, PathBuf};

    /// Asset source rooted at a directory on disk
    #[derive(Debug, Clone)]
    pub struct DirectorySource {
        root: PathBuf,
    }

    impl DirectorySource {
        pub fn new(root: impl Into<PathBuf>) -> Self {
            DirectorySource { root: root.into() }
        }

        pub fn resolve(&self, path: &str) -> PathBuf {
            self.root.join(path)
        }
    }

    impl AssetSource for DirectorySource {
        fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError> {
            let full = self.resolve(path);
            fs::read(&full).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => AssetError::Missing(full.display().to_string()),
                _ => AssetError::Io {
                    path: full.display().to_string(),
                    source: e,
                },
            })
        }
    }

    /// Delivery that writes the file into a directory
    #[derive(Debug, Clone)]
    pub struct DirectoryDelivery {
        dir: PathBuf,
        written: Option<PathBuf>,
    }

    impl DirectoryDelivery {
        pub fn new(dir: impl Into<PathBuf>) -> Self {
            DirectoryDelivery {
                dir: dir.into(),
                written: None,
            }
        }

        /// Path of the last delivered file
        pub fn written(&self) -> Option<&Path> {
            self.written.as_deref()
        }
    }

    impl OutputDelivery for DirectoryDelivery {
        fn deliver(&mut self, filename: &str, bytes: &[u8]) -> Result<(), String> {
            fs::create_dir_all(&self.dir).map_err(|e| format!("{:?}: {}", self.dir, e))?;
            let path = self.dir.join(filename);
            fs::write(&path, bytes).map_err(|e| format!("{:?}: {}", path, e))?;
            self.written = Some(path);
            Ok(())
        }
    }

    /// PNG files in `input` whose names start with `prefix`, sorted by name
    pub fn find_sources(input: &Path, prefix: &str) -> Result<Vec<PathBuf>, CompressError> {
        let io_err = |source| CompressError::Io {
            path: input.display().to_string(),
            source,
        };

        let mut found = Vec::new();
        for entry in fs::read_dir(input).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            let is_png = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("png"))
                .unwrap_or(false);
            if is_png && name.starts_with(prefix) && path.is_file() {
                found.push(path);
            }
        }
        found.sort();
        Ok(found)
    }

    /// Compress every matching PNG in `input` into `<stem>.jpg` under `output`.
    ///
    /// A file that fails is logged and skipped.
    pub fn compress_directory(
        input: &Path,
        output: &Path,
        prefix: &str,
        options: &CompressOptions,
    ) -> Result<CompressSummary, CompressError> {
        if options.quality == 0 || options.quality > 100 {
            return Err(CompressError::InvalidQuality);
        }

        let sources = find_sources(input, prefix)?;
        fs::create_dir_all(output).map_err(|source| CompressError::Io {
            path: output.display().to_string(),
            source,
        })?;

        let mut summary = CompressSummary {
            found: sources.len(),
            ..CompressSummary::default()
        };

        for (i, source) in sources.iter().enumerate() {
            tracing::info!("[{}/{}] Processing: {}", i + 1, sources.len(), source.display());
            match compress_file(source, output, options) {
                Ok((original, compressed)) => {
                    tracing::debug!(
                        "Original: {}, compressed: {}",
                        format_kb(original),
                        format_kb(compressed)
                    );
                    summary.succeeded += 1;
                    summary.original_bytes += original;
                    summary.compressed_bytes += compressed;
                }
                Err(e) => tracing::warn!("Failed to compress {}: {}", source.display(), e),
            }
        }

        Ok(summary)
    }

    /// Returns the original and compressed sizes in bytes
    fn compress_file(source: &Path, output: &Path, options: &CompressOptions) -> Result<(u64, u64), CompressError> {
        let io_err = |path: &Path| {
            let path = path.display().to_string();
            move |source| CompressError::Io { path, source }
        };

        let bytes = fs::read(source).map_err(io_err(source))?;
        let compressed = compress_image(&bytes, options)?;

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let target = output.join(format!("{}.jpg", stem));
        fs::write(&target, &compressed.bytes).map_err(io_err(&target))?;

        Ok((bytes.len() as u64, compressed.bytes.len() as u64))
    }
}
