//! Page geometry
//!
//! All layout happens in document units (millimetres) with the origin at the
//! top-left corner of the page. Conversion to PDF user space (points, origin
//! bottom-left) happens only when content streams are written.

/// Points per millimetre
pub const POINTS_PER_MM: f32 = 72.0 / 25.4;

/// A4 width in millimetres
pub const A4_WIDTH_MM: f32 = 210.0;
/// A4 height in millimetres
pub const A4_HEIGHT_MM: f32 = 297.0;
/// Uniform margin around every image, in millimetres
pub const DEFAULT_MARGIN_MM: f32 = 10.0;

/// Page size plus the margin kept free around images
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width: A4_WIDTH_MM,
            height: A4_HEIGHT_MM,
            margin: DEFAULT_MARGIN_MM,
        }
    }
}

impl PageGeometry {
    /// Width available inside the margins
    pub fn usable_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    /// Height available inside the margins
    pub fn usable_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }

    /// True when the margins leave a non-empty area
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.usable_width() > 0.0 && self.usable_height() > 0.0
    }

    /// Uniform scale that fits `image_width` x `image_height` inside the margins.
    ///
    /// The smaller of the two axis ratios wins so neither side overflows.
    pub fn fit_scale(&self, image_width: u32, image_height: u32) -> f32 {
        let sx = self.usable_width() / image_width as f32;
        let sy = self.usable_height() / image_height as f32;
        sx.min(sy)
    }

    /// Scaled and centred placement for an image of the given pixel size
    pub fn place(&self, image_width: u32, image_height: u32) -> Placement {
        let scale = self.fit_scale(image_width, image_height);
        let width = image_width as f32 * scale;
        let height = image_height as f32 * scale;

        Placement {
            x: (self.width - width) / 2.0,
            y: (self.height - height) / 2.0,
            width,
            height,
            scale,
        }
    }

    /// Page size in points, for the MediaBox
    pub fn size_in_points(&self) -> (f32, f32) {
        (self.width * POINTS_PER_MM, self.height * POINTS_PER_MM)
    }
}

/// Where an image lands on its page, in document units from the top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Document units per pixel
    pub scale: f32,
}

impl Placement {
    /// Transformation matrix `[w 0 0 h x y]` in PDF user space for a page of
    /// `page_height` document units. Image XObjects occupy the unit square, so
    /// the matrix both scales and positions them.
    pub fn to_pdf_matrix(&self, page_height: f32) -> [f32; 6] {
        let w = self.width * POINTS_PER_MM;
        let h = self.height * POINTS_PER_MM;
        let x = self.x * POINTS_PER_MM;
        let y = (page_height - self.y - self.height) * POINTS_PER_MM;
        [w, 0.0, 0.0, h, x, y]
    }
}

/// Convert a top-left based text baseline position into PDF user space
pub fn text_origin(x: f32, y: f32, page_height: f32) -> (f32, f32) {
    (x * POINTS_PER_MM, (page_height - y) * POINTS_PER_MM)
}
