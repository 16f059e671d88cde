use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use scan_gallery::file_ops::{compress_directory, DirectoryDelivery, DirectorySource};
use scan_gallery::layout::POINTS_PER_MM;
use scan_gallery::{
    Catalog, CatalogConfig, CompressOptions, ExportOptions, ExportStatus, Exporter,
    MemoryDelivery, MemorySource, PageOutcome, ProgressEvent,
};
use std::fs;
use std::path::Path;
use std::time::Duration;

fn options() -> ExportOptions {
    ExportOptions {
        inter_page_pause: Duration::ZERO,
        ..ExportOptions::default()
    }
}

fn write_image(path: &Path, img: DynamicImage, format: ImageFormat) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    img.save_with_format(path, format).unwrap();
}

fn page_operations(doc: &Document, page_id: ObjectId) -> Vec<(String, Vec<Object>)> {
    let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
    content
        .operations
        .into_iter()
        .map(|op| (op.operator, op.operands))
        .collect()
}

fn shown_text(ops: &[(String, Vec<Object>)]) -> Option<String> {
    ops.iter().find(|(op, _)| op == "Tj").and_then(|(_, operands)| match operands.first() {
        Some(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    })
}

#[test]
fn missing_middle_page_becomes_a_text_page() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Catalog::build(3);
    for entry in catalog.iter().filter(|e| e.index != 1) {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 200, Rgb([200, 10, 10])));
        write_image(&dir.path().join(&entry.asset_path), img, ImageFormat::Jpeg);
    }

    let out = dir.path().join("out");
    let mut delivery = DirectoryDelivery::new(&out);
    let mut events = Vec::new();
    let report = Exporter::new(options())
        .export(
            &catalog,
            &DirectorySource::new(dir.path()),
            &mut |e: ProgressEvent| events.push(e),
            &mut delivery,
        )
        .unwrap();

    let kinds: Vec<bool> = report.pages.iter().map(PageOutcome::is_fallback).collect();
    assert_eq!(kinds, [false, true, false]);
    assert_eq!(events.last(), Some(&ProgressEvent::Finished(ExportStatus::Success)));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Finished(_)))
            .count(),
        1
    );

    let written = delivery.written().unwrap();
    let name = written.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("document-pages-") && name.ends_with(".pdf"));
    assert_eq!(name.len(), "document-pages-YYYY-MM-DD.pdf".len());

    let doc = Document::load(written).unwrap();
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 3);

    let first = page_operations(&doc, pages[&1]);
    assert!(first.iter().any(|(op, _)| op == "Do"));
    assert!(shown_text(&first).is_none());

    let second = page_operations(&doc, pages[&2]);
    assert!(!second.iter().any(|(op, _)| op == "Do"));
    assert_eq!(shown_text(&second).as_deref(), Some("Page 2 - Image not available"));

    let third = page_operations(&doc, pages[&3]);
    assert!(third.iter().any(|(op, _)| op == "Do"));
}

#[test]
fn images_are_centred_and_fit_the_margins() {
    let catalog = Catalog::build(2);
    let mut source = MemorySource::new();
    let sizes = [(1000, 2000), (3000, 1000)];
    for (entry, (w, h)) in catalog.iter().zip(sizes) {
        let img = DynamicImage::ImageRgb8(RgbImage::new(w, h));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        source.insert(entry.asset_path.clone(), bytes);
    }

    let mut delivery = MemoryDelivery::default();
    let report = Exporter::new(options())
        .export(&catalog, &source, &mut |_: ProgressEvent| {}, &mut delivery)
        .unwrap();

    match &report.pages[0] {
        PageOutcome::Image { placement, .. } => {
            assert!((placement.width - 138.5).abs() < 1e-2);
            assert!((placement.height - 277.0).abs() < 1e-2);
            assert!((placement.x - 35.75).abs() < 1e-2);
            assert!((placement.y - 10.0).abs() < 1e-2);
        }
        other => panic!("expected an image page, got {:?}", other),
    }

    let doc = Document::load_mem(&delivery.bytes).unwrap();
    let pages = doc.get_pages();
    for (page_no, page_id) in pages {
        let ops = page_operations(&doc, page_id);
        let (_, cm) = ops.iter().find(|(op, _)| op == "cm").unwrap();
        let m: Vec<f32> = cm.iter().map(|o| o.as_float().unwrap()).collect();
        let (w, h, x, y) = (m[0], m[3], m[4], m[5]);

        let margin = 10.0 * POINTS_PER_MM;
        let page_w = 210.0 * POINTS_PER_MM;
        let page_h = 297.0 * POINTS_PER_MM;
        assert!(w <= page_w - 2.0 * margin + 0.01, "page {}", page_no);
        assert!(h <= page_h - 2.0 * margin + 0.01, "page {}", page_no);
        assert!((x - (page_w - w) / 2.0).abs() < 0.01);
        assert!((y - (page_h - h) / 2.0).abs() < 0.01);
    }
}

#[test]
fn repeated_exports_have_identical_layout() {
    let catalog = Catalog::build(4);
    let mut source = MemorySource::new();
    for entry in catalog.iter().filter(|e| e.index != 2) {
        let img = DynamicImage::ImageRgb8(RgbImage::new(30 + entry.index as u32 * 7, 50));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        source.insert(entry.asset_path.clone(), bytes);
    }

    let exporter = Exporter::new(options());
    let first = exporter
        .export(&catalog, &source, &mut |_: ProgressEvent| {}, &mut MemoryDelivery::default())
        .unwrap();
    let second = exporter
        .export(&catalog, &source, &mut |_: ProgressEvent| {}, &mut MemoryDelivery::default())
        .unwrap();

    assert_eq!(first.page_count(), second.page_count());
    assert_eq!(first.pages, second.pages);
}

#[test]
fn transparent_pages_get_a_soft_mask() {
    let catalog = Catalog::build(1);
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([0, 0, 255, 100])));
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    let mut source = MemorySource::new();
    source.insert(catalog.get(0).unwrap().asset_path.clone(), bytes);

    let mut delivery = MemoryDelivery::default();
    Exporter::new(options())
        .export(&catalog, &source, &mut |_: ProgressEvent| {}, &mut delivery)
        .unwrap();

    let doc = Document::load_mem(&delivery.bytes).unwrap();
    let has_smask = doc.objects.values().any(|obj| match obj {
        Object::Stream(stream) => stream.dict.has(b"SMask"),
        _ => false,
    });
    assert!(has_smask);
}

#[test]
fn compressed_assets_feed_the_export() {
    let dir = tempfile::tempdir().unwrap();
    let scans = dir.path().join("scans");
    let config = CatalogConfig {
        count: 2,
        ..CatalogConfig::default()
    };

    for page in 1..=2 {
        let name = format!("{}_页面_{:02}.png", config.prefix, page);
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2400, 600, Rgb([30, 60, 90])));
        write_image(&scans.join(name), img, ImageFormat::Png);
    }
    fs::write(scans.join("notes.txt"), "ignored").unwrap();

    let assets = dir.path().join("site");
    let summary = compress_directory(
        &scans,
        &assets.join(&config.directory),
        "2_CamScanner",
        &CompressOptions::default(),
    )
    .unwrap();
    assert_eq!(summary.found, 2);
    assert_eq!(summary.succeeded, 2);

    let first = image::open(assets.join(&config.directory).join(format!(
        "{}_页面_01.jpg",
        config.prefix
    )))
    .unwrap();
    assert_eq!((first.width(), first.height()), (1200, 300));

    let report = Exporter::new(options())
        .export(
            &Catalog::from_config(&config),
            &DirectorySource::new(&assets),
            &mut |_: ProgressEvent| {},
            &mut MemoryDelivery::default(),
        )
        .unwrap();
    assert_eq!(report.fallback_count(), 0);
    assert_eq!(report.page_count(), 2);
}
