//! WebAssembly bindings for the Scanned Page Gallery

use crate::{AssetError, Catalog, CompressOptions, ExportJob, ExportOptions, PageOutcome};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogEntryJs<'a> {
    index: usize,
    page_number: usize,
    asset_path: &'a str,
    title: &'a str,
}

/// The page catalog as a JSON array
///
/// # Arguments
/// * `count` - Number of pages (default: 78)
#[wasm_bindgen]
pub fn catalog_json(count: Option<usize>) -> Result<String, JsError> {
    let catalog = match count {
        Some(count) => Catalog::build(count),
        None => Catalog::default(),
    };
    let entries: Vec<CatalogEntryJs> = catalog
        .iter()
        .map(|entry| CatalogEntryJs {
            index: entry.index,
            page_number: entry.page_number(),
            asset_path: &entry.asset_path,
            title: &entry.title,
        })
        .collect();

    serde_json::to_string(&entries).map_err(|e| JsError::new(&e.to_string()))
}

/// A PDF export driven one page at a time from JavaScript
///
/// The caller fetches each asset itself and yields between steps, so the
/// page stays responsive and can repaint progress:
///
/// ```js
/// const run = new ExportRun();
/// while (!run.isDone) {
///   const res = await fetch(run.nextAssetPath).catch(() => null);
///   const bytes = res && res.ok ? new Uint8Array(await res.arrayBuffer()) : undefined;
///   run.processNext(bytes);
///   await new Promise((r) => setTimeout(r, 10));
/// }
/// const result = run.finish();
/// ```
#[wasm_bindgen]
pub struct ExportRun {
    job: ExportJob<'static>,
    compress_streams: bool,
    progress: Option<js_sys::Function>,
}

#[wasm_bindgen]
impl ExportRun {
    /// Start an export
    ///
    /// # Arguments
    /// * `count` - Number of pages (default: 78)
    #[wasm_bindgen(constructor)]
    pub fn new(count: Option<usize>) -> ExportRun {
        let catalog = match count {
            Some(count) => Catalog::build(count),
            None => Catalog::default(),
        };
        let options = ExportOptions::default();

        ExportRun {
            job: ExportJob::owned(catalog.entries().to_vec(), options.geometry),
            compress_streams: options.compress_streams,
            progress: None,
        }
    }

    /// Register a `(current, total)` callback invoked before each page
    #[wasm_bindgen(js_name = onProgress)]
    pub fn on_progress(&mut self, callback: js_sys::Function) {
        self.progress = Some(callback);
    }

    /// Asset path of the page the next step processes
    #[wasm_bindgen(getter, js_name = nextAssetPath)]
    pub fn next_asset_path(&self) -> Option<String> {
        self.job.next_entry().map(|entry| entry.asset_path.clone())
    }

    /// Number of pages processed so far
    #[wasm_bindgen(getter)]
    pub fn completed(&self) -> usize {
        self.job.cursor()
    }

    #[wasm_bindgen(getter)]
    pub fn total(&self) -> usize {
        self.job.total()
    }

    #[wasm_bindgen(getter, js_name = isDone)]
    pub fn is_done(&self) -> bool {
        self.job.is_done()
    }

    /// Process the next page from its encoded bytes; `undefined` means the
    /// asset could not be fetched. Returns false when the page fell back to text.
    #[wasm_bindgen(js_name = processNext)]
    pub fn process_next(&mut self, bytes: Option<Vec<u8>>) -> Result<bool, JsError> {
        let path = match self.job.next_entry() {
            Some(entry) => entry.asset_path.clone(),
            None => return Err(JsError::new("All pages have been processed")),
        };

        if let Some(callback) = self.progress.as_ref() {
            let current = JsValue::from((self.job.cursor() + 1) as u32);
            let total = JsValue::from(self.job.total() as u32);
            if let Err(e) = callback.call2(&JsValue::NULL, &current, &total) {
                web_sys::console::warn_2(&"Progress callback failed:".into(), &e);
            }
        }

        let fetched = bytes.ok_or(AssetError::Missing(path));
        match self.job.process_fetched(fetched) {
            Some(PageOutcome::Fallback { index, reason }) => {
                web_sys::console::warn_1(
                    &format!("Failed to process image {}: {}", index + 1, reason).into(),
                );
                Ok(false)
            }
            Some(PageOutcome::Image { .. }) => Ok(true),
            None => Err(JsError::new("All pages have been processed")),
        }
    }

    /// Write the PDF once every page has been processed
    pub fn finish(self) -> Result<ExportResultJs, JsError> {
        if !self.job.is_done() {
            return Err(JsError::new(&format!(
                "Export finished early: {} of {} pages processed",
                self.job.cursor(),
                self.job.total()
            )));
        }

        let today = chrono::Utc::now().date_naive();
        let (report, pdf_bytes) = self
            .job
            .finalize(today, self.compress_streams)
            .map_err(|e| JsError::new(&e.to_string()))?;

        let pages_json = serde_json::to_string(&pages_to_json(&report.pages))
            .unwrap_or_else(|_| "[]".to_string());

        Ok(ExportResultJs {
            pdf_bytes,
            page_count: report.page_count(),
            fallback_count: report.fallback_count(),
            filename: report.filename,
            pages_json,
        })
    }
}

/// Convert page outcomes to a JSON-serializable structure
fn pages_to_json(pages: &[PageOutcome]) -> Vec<serde_json::Value> {
    pages
        .iter()
        .map(|page| match page {
            PageOutcome::Image {
                index,
                pixel_width,
                pixel_height,
                placement,
            } => serde_json::json!({
                "page": index + 1,
                "kind": "image",
                "pixelWidth": pixel_width,
                "pixelHeight": pixel_height,
                "x": placement.x,
                "y": placement.y,
                "width": placement.width,
                "height": placement.height
            }),
            PageOutcome::Fallback { index, reason } => serde_json::json!({
                "page": index + 1,
                "kind": "fallback",
                "reason": reason
            }),
        })
        .collect()
}

/// Shrink one scanned image into a JPEG page asset
///
/// # Arguments
/// * `image_bytes` - The source image as a byte array
/// * `quality` - JPEG quality 1-100 (default: 85)
/// * `max_width` - Wider images are downscaled to this width (default: 1200)
#[wasm_bindgen]
pub fn compress_image(
    image_bytes: &[u8],
    quality: Option<u8>,
    max_width: Option<u32>,
) -> Result<Vec<u8>, JsError> {
    let defaults = CompressOptions::default();
    let options = CompressOptions {
        quality: quality.unwrap_or(defaults.quality),
        max_width: max_width.unwrap_or(defaults.max_width),
    };

    crate::compress_image(image_bytes, &options)
        .map(|compressed| compressed.bytes)
        .map_err(|e| JsError::new(&e.to_string()))
}

/// Result of a PDF export
#[wasm_bindgen]
pub struct ExportResultJs {
    pdf_bytes: Vec<u8>,
    filename: String,
    page_count: usize,
    fallback_count: usize,
    pages_json: String,
}

#[wasm_bindgen]
impl ExportResultJs {
    /// Get the PDF bytes
    #[wasm_bindgen(getter)]
    pub fn pdf_bytes(&self) -> Vec<u8> {
        self.pdf_bytes.clone()
    }

    /// Get the name to save the PDF under
    #[wasm_bindgen(getter)]
    pub fn filename(&self) -> String {
        self.filename.clone()
    }

    /// Get the number of pages in the PDF
    #[wasm_bindgen(getter)]
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Get the number of pages whose image was not available
    #[wasm_bindgen(getter)]
    pub fn fallback_count(&self) -> usize {
        self.fallback_count
    }

    /// Get per-page details as JSON string
    #[wasm_bindgen(getter)]
    pub fn pages_json(&self) -> String {
        self.pages_json.clone()
    }
}
