//! Append-only multi-page PDF assembly
//!
//! Pages start with one blank initial page, like a fresh sheet of paper:
//! the first thing drawn lands on it, and every further page must be added
//! explicitly with [`PageDocument::add_page`].

use crate::layout::{text_origin, PageGeometry, Placement};
use crate::raster::RasterImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// Font size for text lines, in points
pub const TEXT_FONT_SIZE: f32 = 16.0;

const FONT_RESOURCE: &str = "F1";

/// Drawing state of one page until the document is finalized
#[derive(Debug, Default)]
struct PageSlot {
    operations: Vec<Operation>,
    xobjects: Dictionary,
    uses_font: bool,
}

/// What was drawn on a page, in drawing order
#[derive(Debug, Clone, PartialEq)]
pub enum PageItem {
    Image { name: String, placement: Placement },
    Text { x: f32, y: f32, text: String },
}

/// Multi-page document under construction
pub struct PageDocument {
    doc: Document,
    geometry: PageGeometry,
    pages_id: ObjectId,
    slots: Vec<PageSlot>,
    items: Vec<Vec<PageItem>>,
    image_count: usize,
}

impl PageDocument {
    /// New document holding a single blank page
    pub fn new(geometry: PageGeometry) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        PageDocument {
            doc,
            geometry,
            pages_id,
            slots: vec![PageSlot::default()],
            items: vec![Vec::new()],
            image_count: 0,
        }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn page_count(&self) -> usize {
        self.slots.len()
    }

    /// Items drawn on each page so far
    pub fn items(&self) -> &[Vec<PageItem>] {
        &self.items
    }

    /// Append a blank page; later drawing goes there
    pub fn add_page(&mut self) {
        self.slots.push(PageSlot::default());
        self.items.push(Vec::new());
    }

    /// Draw an image on the current page.
    ///
    /// The raster streams are written into the document right away, so the
    /// caller can drop its pixels before the next page is decoded.
    pub fn draw_image(&mut self, raster: &RasterImage, placement: Placement) {
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);

        let mut color = raster.color_stream();
        if let Some(mask) = raster.mask_stream() {
            let mask_id = self.doc.add_object(mask);
            color.dict.set("SMask", mask_id);
        }
        let image_id = self.doc.add_object(color);

        let [a, b, c, d, e, f] = placement.to_pdf_matrix(self.geometry.height);
        let slot = self.current_slot();
        slot.xobjects.set(name.as_str(), image_id);
        slot.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![a.into(), b.into(), c.into(), d.into(), e.into(), f.into()],
            ),
            Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ]);

        self.current_items().push(PageItem::Image { name, placement });
    }

    /// Draw one line of text with its baseline at `(x, y)` document units
    /// from the top-left corner of the current page
    pub fn draw_text(&mut self, x: f32, y: f32, text: &str) {
        let (px, py) = text_origin(x, y, self.geometry.height);
        let slot = self.current_slot();
        slot.uses_font = true;
        slot.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), TEXT_FONT_SIZE.into()],
            ),
            Operation::new("Td", vec![px.into(), py.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ]);

        self.current_items().push(PageItem::Text {
            x,
            y,
            text: text.to_string(),
        });
    }

    fn current_slot(&mut self) -> &mut PageSlot {
        // slots is never empty: new() seeds the initial page
        let last = self.slots.len() - 1;
        &mut self.slots[last]
    }

    fn current_items(&mut self) -> &mut Vec<PageItem> {
        let last = self.items.len() - 1;
        &mut self.items[last]
    }

    /// Write the page tree and catalog, returning the finished document
    pub fn finish(mut self) -> Result<Document, lopdf::Error> {
        let (width_pt, height_pt) = self.geometry.size_in_points();

        let font_id = if self.slots.iter().any(|s| s.uses_font) {
            Some(self.doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            }))
        } else {
            None
        };

        let mut kids = Vec::with_capacity(self.slots.len());
        for slot in std::mem::take(&mut self.slots) {
            let content = Content {
                operations: slot.operations,
            };
            let content_id = self.doc.add_object(Stream::new(dictionary! {}, content.encode()?));

            let mut resources = Dictionary::new();
            if !slot.xobjects.is_empty() {
                resources.set("XObject", slot.xobjects);
            }
            if let (true, Some(font_id)) = (slot.uses_font, font_id) {
                resources.set("Font", dictionary! { FONT_RESOURCE => font_id });
            }

            let page_id = self.doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => self.pages_id,
                "MediaBox" => vec![0.into(), 0.into(), width_pt.into(), height_pt.into()],
                "Resources" => resources,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        Ok(self.doc)
    }
}

/// Serialize a finished document
pub fn save_to_bytes(mut doc: Document, compress_streams: bool) -> Result<Vec<u8>, lopdf::Error> {
    if compress_streams {
        doc.compress();
    }

    let mut output_bytes = Vec::new();
    doc.save_to(&mut output_bytes)?;
    Ok(output_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn raster(w: u32, h: u32) -> RasterImage {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([0, 0, 0])));
        RasterImage::from_image(&img).unwrap()
    }

    fn operators(doc: &Document, page_id: ObjectId) -> Vec<String> {
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        content.operations.into_iter().map(|op| op.operator).collect()
    }

    #[test]
    fn starts_with_one_blank_page() {
        let pdf = PageDocument::new(PageGeometry::default());
        assert_eq!(pdf.page_count(), 1);

        let doc = pdf.finish().unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn images_and_text_land_on_their_pages() {
        let geometry = PageGeometry::default();
        let mut pdf = PageDocument::new(geometry);
        pdf.draw_image(&raster(10, 20), geometry.place(10, 20));
        pdf.add_page();
        pdf.draw_text(20.0, 20.0, "Page 2 - Image not available");
        assert_eq!(pdf.items()[1].len(), 1);

        let doc = pdf.finish().unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);

        assert_eq!(operators(&doc, pages[&1]), ["q", "cm", "Do", "Q"]);
        assert_eq!(operators(&doc, pages[&2]), ["BT", "Tf", "Td", "Tj", "ET"]);
    }

    #[test]
    fn saved_bytes_load_back() {
        let geometry = PageGeometry::default();
        let mut pdf = PageDocument::new(geometry);
        pdf.draw_image(&raster(3, 3), geometry.place(3, 3));
        pdf.add_page();
        pdf.draw_image(&raster(5, 2), geometry.place(5, 2));

        let bytes = save_to_bytes(pdf.finish().unwrap(), true).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let reloaded = Document::load_mem(&bytes).unwrap();
        assert_eq!(reloaded.get_pages().len(), 2);
    }
}
