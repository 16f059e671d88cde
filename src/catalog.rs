//! Page catalog
//!
//! The catalog is derived from a naming rule instead of a directory listing:
//! page `n` always lives at `<directory>/<prefix>_页面_<nn>.<extension>`.

/// Number of pages in the reference deployment
pub const DEFAULT_PAGE_COUNT: usize = 78;
/// Directory holding the compressed page assets
pub const DEFAULT_ASSET_DIRECTORY: &str = "compressed_images";
/// Filename prefix shared by every scanned page
pub const DEFAULT_ASSET_PREFIX: &str = "2_CamScanner 06-10-2025 08.32";
/// Separator between the prefix and the page number
pub const PAGE_MARKER: &str = "页面";

/// Naming rule for the page assets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// How many pages exist
    pub count: usize,
    /// Directory the asset paths are relative to (empty for none)
    pub directory: String,
    /// Filename prefix before the page marker
    pub prefix: String,
    /// Asset file extension, without the dot
    pub extension: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_PAGE_COUNT,
            directory: DEFAULT_ASSET_DIRECTORY.to_string(),
            prefix: DEFAULT_ASSET_PREFIX.to_string(),
            extension: "jpg".to_string(),
        }
    }
}

impl CatalogConfig {
    /// Asset path for a 1-based page number.
    ///
    /// The page number is zero-padded to two digits; the external assets are
    /// named that way, so any other padding fails to resolve.
    pub fn asset_path(&self, page_number: usize) -> String {
        let filename = format!(
            "{}_{}_{:02}.{}",
            self.prefix, PAGE_MARKER, page_number, self.extension
        );
        if self.directory.is_empty() {
            filename
        } else {
            format!("{}/{}", self.directory.trim_end_matches('/'), filename)
        }
    }
}

/// One page of the gallery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    /// Zero-based position, also the output page order
    pub index: usize,
    /// Reference handed to the asset source
    pub asset_path: String,
    /// Human-readable label
    pub title: String,
}

impl PageEntry {
    /// 1-based page number
    pub fn page_number(&self) -> usize {
        self.index + 1
    }
}

/// Ordered, immutable list of pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<PageEntry>,
}

impl Catalog {
    /// Build a catalog of `count` pages using the reference naming rule
    pub fn build(count: usize) -> Self {
        Self::from_config(&CatalogConfig {
            count,
            ..CatalogConfig::default()
        })
    }

    /// Build a catalog from an explicit naming rule
    pub fn from_config(config: &CatalogConfig) -> Self {
        let entries = (1..=config.count)
            .map(|page_number| PageEntry {
                index: page_number - 1,
                asset_path: config.asset_path(page_number),
                title: format!("Page {}", page_number),
            })
            .collect();

        Catalog { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PageEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PageEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[PageEntry] {
        &self.entries
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::from_config(&CatalogConfig::default())
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a PageEntry;
    type IntoIter = std::slice::Iter<'a, PageEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
