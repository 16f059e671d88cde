//! Catalog to PDF export
//!
//! An export walks the catalog strictly in order, one page at a time: fetch
//! the asset, decode it, normalize it, fit it to the page and draw it. A page
//! that cannot be fetched or decoded becomes a one-line text page and the run
//! carries on. Only one decoded bitmap is alive at any moment.

use crate::catalog::{Catalog, PageEntry};
use crate::document::{save_to_bytes, PageDocument};
use crate::layout::{PageGeometry, Placement};
use crate::raster::RasterImage;
use crate::{AssetError, ExportError, ExportOptions};
use chrono::NaiveDate;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Baseline position of the fallback line, in document units from the top-left
pub const FALLBACK_TEXT_POSITION: (f32, f32) = (20.0, 20.0);

/// Resolves asset paths to encoded image bytes
pub trait AssetSource {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError>;
}

/// Asset source backed by an in-memory map
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    assets: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        self.assets.insert(path.into(), bytes);
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl AssetSource for MemorySource {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        self.assets
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::Missing(path.to_string()))
    }
}

/// Terminal status of an export run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    Success,
    Failure,
}

/// Notification sent to a progress sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// About to process page `current` (1-based) of `total`
    Page { current: usize, total: usize },
    /// Sent exactly once per started run
    Finished(ExportStatus),
}

/// Observer of export progress
pub trait ProgressSink {
    fn report(&mut self, event: ProgressEvent);
}

impl<F: FnMut(ProgressEvent)> ProgressSink for F {
    fn report(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// Hands the finished file to whatever saves or downloads it
pub trait OutputDelivery {
    fn deliver(&mut self, filename: &str, bytes: &[u8]) -> Result<(), String>;
}

/// Delivery that keeps the last delivered file in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryDelivery {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

impl OutputDelivery for MemoryDelivery {
    fn deliver(&mut self, filename: &str, bytes: &[u8]) -> Result<(), String> {
        self.filename = Some(filename.to_string());
        self.bytes = bytes.to_vec();
        Ok(())
    }
}

/// Cooperative cancellation flag, checked between pages
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// What happened to one catalog entry
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Image {
        index: usize,
        pixel_width: u32,
        pixel_height: u32,
        placement: Placement,
    },
    Fallback {
        index: usize,
        reason: String,
    },
}

impl PageOutcome {
    pub fn index(&self) -> usize {
        match self {
            PageOutcome::Image { index, .. } | PageOutcome::Fallback { index, .. } => *index,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, PageOutcome::Fallback { .. })
    }
}

/// Summary of a completed export
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub filename: String,
    pub pages: Vec<PageOutcome>,
    pub size_bytes: usize,
}

impl ExportReport {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn fallback_count(&self) -> usize {
        self.pages.iter().filter(|p| p.is_fallback()).count()
    }

    pub fn image_count(&self) -> usize {
        self.page_count() - self.fallback_count()
    }
}

/// Name of the exported file for a run on `date`
pub fn output_filename(date: NaiveDate) -> String {
    format!("document-pages-{}.pdf", date.format("%Y-%m-%d"))
}

/// Decode and normalize one page from its encoded bytes
fn decode_page(entry: &PageEntry, bytes: &[u8]) -> Result<RasterImage, AssetError> {
    let img = image::load_from_memory(bytes).map_err(|e| AssetError::Decode {
        path: entry.asset_path.clone(),
        message: e.to_string(),
    })?;
    RasterImage::from_image(&img).map_err(|message| AssetError::Decode {
        path: entry.asset_path.clone(),
        message,
    })
}

/// State of a single export run.
///
/// Hosts that must stay responsive drive the job themselves: fetch the asset
/// for [`ExportJob::next_entry`], hand the bytes to
/// [`ExportJob::process_fetched`], yield, repeat, then [`ExportJob::finalize`].
pub struct ExportJob<'a> {
    entries: Cow<'a, [PageEntry]>,
    cursor: usize,
    document: PageDocument,
    outcomes: Vec<PageOutcome>,
}

impl<'a> ExportJob<'a> {
    pub fn new(entries: &'a [PageEntry], geometry: PageGeometry) -> Self {
        ExportJob {
            entries: Cow::Borrowed(entries),
            cursor: 0,
            document: PageDocument::new(geometry),
            outcomes: Vec::with_capacity(entries.len()),
        }
    }

    /// Job that owns its entries, for hosts that keep it across calls
    pub fn owned(entries: Vec<PageEntry>, geometry: PageGeometry) -> ExportJob<'static> {
        let outcomes = Vec::with_capacity(entries.len());
        ExportJob {
            entries: Cow::Owned(entries),
            cursor: 0,
            document: PageDocument::new(geometry),
            outcomes,
        }
    }

    /// Index of the next entry to process
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn is_done(&self) -> bool {
        self.cursor >= self.entries.len()
    }

    pub fn document(&self) -> &PageDocument {
        &self.document
    }

    /// Entry the next call will process
    pub fn next_entry(&self) -> Option<&PageEntry> {
        self.entries.get(self.cursor)
    }

    pub fn outcomes(&self) -> &[PageOutcome] {
        &self.outcomes
    }

    /// Process the entry under the cursor and advance.
    ///
    /// Returns `None` once every entry has been processed.
    pub fn process_next(&mut self, source: &dyn AssetSource) -> Option<&PageOutcome> {
        let path = self.next_entry()?.asset_path.clone();
        self.process_fetched(source.fetch(&path))
    }

    /// Process the entry under the cursor from bytes the caller fetched
    /// itself, or from the error that fetching produced.
    pub fn process_fetched(
        &mut self,
        fetched: Result<Vec<u8>, AssetError>,
    ) -> Option<&PageOutcome> {
        let entry = self.next_entry()?.clone();

        // the first entry reuses the initial page
        if self.cursor > 0 {
            self.document.add_page();
        }

        let outcome = match fetched.and_then(|bytes| decode_page(&entry, &bytes)) {
            Ok(raster) => {
                let placement = self.document.geometry().place(raster.width, raster.height);
                self.document.draw_image(&raster, placement);
                tracing::debug!(
                    page = entry.page_number(),
                    width = raster.width,
                    height = raster.height,
                    "Placed page image"
                );
                PageOutcome::Image {
                    index: entry.index,
                    pixel_width: raster.width,
                    pixel_height: raster.height,
                    placement,
                }
            }
            Err(e) => {
                tracing::warn!(page = entry.page_number(), "Failed to process image: {}", e);
                let (x, y) = FALLBACK_TEXT_POSITION;
                self.document.draw_text(
                    x,
                    y,
                    &format!("Page {} - Image not available", entry.page_number()),
                );
                PageOutcome::Fallback {
                    index: entry.index,
                    reason: e.to_string(),
                }
            }
        };

        self.cursor += 1;
        self.outcomes.push(outcome);
        self.outcomes.last()
    }

    /// Hand over the accumulated document and per-page outcomes
    pub fn finish(self) -> (PageDocument, Vec<PageOutcome>) {
        (self.document, self.outcomes)
    }

    /// Write the PDF and name it after `date`
    pub fn finalize(
        self,
        date: NaiveDate,
        compress_streams: bool,
    ) -> Result<(ExportReport, Vec<u8>), ExportError> {
        let (document, pages) = self.finish();
        let bytes = save_to_bytes(document.finish()?, compress_streams)?;
        let report = ExportReport {
            filename: output_filename(date),
            pages,
            size_bytes: bytes.len(),
        };
        Ok((report, bytes))
    }
}

/// Runs exports, at most one at a time
pub struct Exporter {
    options: ExportOptions,
    active: AtomicBool,
    cancel: CancelToken,
}

/// Clears the active flag when a run ends, however it ends
struct ActiveGuard<'a>(&'a AtomicBool);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Exporter {
    pub fn new(options: ExportOptions) -> Self {
        Exporter {
            options,
            active: AtomicBool::new(false),
            cancel: CancelToken::default(),
        }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// True while a run is in progress
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Token that stops the current run before its next page
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Export the catalog, naming the file after today's UTC date
    pub fn export(
        &self,
        catalog: &Catalog,
        source: &dyn AssetSource,
        progress: &mut dyn ProgressSink,
        delivery: &mut dyn OutputDelivery,
    ) -> Result<ExportReport, ExportError> {
        let today = chrono::Utc::now().date_naive();
        self.export_on(today, catalog, source, progress, delivery)
    }

    /// Export the catalog as if run on `date`
    pub fn export_on(
        &self,
        date: NaiveDate,
        catalog: &Catalog,
        source: &dyn AssetSource,
        progress: &mut dyn ProgressSink,
        delivery: &mut dyn OutputDelivery,
    ) -> Result<ExportReport, ExportError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ExportError::AlreadyRunning);
        }
        let _guard = ActiveGuard(&self.active);
        self.cancel.reset();

        let result = self.run(date, catalog, source, progress, delivery);
        match &result {
            Ok(report) => {
                tracing::info!(
                    pages = report.page_count(),
                    fallbacks = report.fallback_count(),
                    "Exported {}",
                    report.filename
                );
                progress.report(ProgressEvent::Finished(ExportStatus::Success));
            }
            Err(e) => {
                tracing::error!("Error generating PDF: {}", e);
                progress.report(ProgressEvent::Finished(ExportStatus::Failure));
            }
        }
        result
    }

    fn run(
        &self,
        date: NaiveDate,
        catalog: &Catalog,
        source: &dyn AssetSource,
        progress: &mut dyn ProgressSink,
        delivery: &mut dyn OutputDelivery,
    ) -> Result<ExportReport, ExportError> {
        if catalog.is_empty() {
            return Err(ExportError::EmptyCatalog);
        }
        let geometry = self.options.geometry;
        if !geometry.is_valid() {
            return Err(ExportError::InvalidGeometry(geometry));
        }

        let mut job = ExportJob::new(catalog.entries(), geometry);
        let total = job.total();

        while !job.is_done() {
            if self.cancel.is_cancelled() {
                return Err(ExportError::Cancelled {
                    completed: job.cursor(),
                    total,
                });
            }
            progress.report(ProgressEvent::Page {
                current: job.cursor() + 1,
                total,
            });
            job.process_next(source);
            self.pause();
        }

        let (report, bytes) = job.finalize(date, self.options.compress_streams)?;
        delivery
            .deliver(&report.filename, &bytes)
            .map_err(|message| ExportError::Delivery {
                filename: report.filename.clone(),
                message,
            })?;

        Ok(report)
    }

    /// Give the host a moment between pages.
    ///
    /// A browser main thread cannot sleep; wasm hosts step an
    /// [`ExportJob`] themselves and await a timer between pages instead.
    fn pause(&self) {
        #[cfg(not(target_arch = "wasm32"))]
        if !self.options.inter_page_pause.is_zero() {
            std::thread::sleep(self.options.inter_page_pause);
        }
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(ExportOptions::default())
    }
}
