//! End-to-end rewrite through the real codec backend.
//!
//! Builds a throwaway project with synthetic source images, runs documents
//! through `SrcsetTransform`, and decodes the written variants back to check
//! their dimensions.

use html_srcset::cache::RenderCache;
use html_srcset::config::{BuildPaths, UserOptions};
use html_srcset::format::FormatToggles;
use html_srcset::transform::{DocumentStatus, SrcsetTransform};
use image::{ImageBuffer, Rgb, Rgba};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_gradient_jpeg(path: &Path, width: u32, height: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    img.save(path).unwrap();
}

fn write_transparent_png(path: &Path, width: u32, height: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = ImageBuffer::from_fn(width, height, |x, _| Rgba([200, 40, 40, (x % 256) as u8]));
    img.save(path).unwrap();
}

fn options(widths: &[u32]) -> UserOptions {
    UserOptions {
        output_widths: Some(widths.to_vec()),
        output_formats: Some(FormatToggles {
            png: Some(true),
            webp: Some(true),
            jpeg: Some(true),
            avif: Some(false),
        }),
        ..Default::default()
    }
}

#[test]
fn marked_jpeg_is_expanded_with_real_files() {
    let tmp = TempDir::new().unwrap();
    write_gradient_jpeg(&tmp.path().join("public/images/hero.jpg"), 960, 540);

    let transform = SrcsetTransform::new(options(&[320, 640, 1280])).unwrap();
    let paths = BuildPaths::new(tmp.path());
    transform.configure(paths.clone());

    let html = r#"<main><img src="/images/hero.jpg?srcset" alt="Hero"></main>"#;
    let out = transform.transform_index_html(html, "index.html");

    assert!(out.contains(r#"src="/assets/hero-320w.jpeg""#), "{out}");
    assert!(out.contains(
        r#"srcset="/assets/hero-320w.jpeg 320w, /assets/hero-640w.jpeg 640w""#
    ));
    assert!(out.contains(r#"sizes="(max-width: 768px) 100vw, (max-width: 1200px) 50vw, 33vw""#));

    let assets = paths.assets_output_dir();
    for ext in ["png", "webp", "jpeg"] {
        let (w, h) = image::image_dimensions(assets.join(format!("hero-640w.{ext}"))).unwrap();
        assert_eq!((w, h), (640, 360), "{ext}");
    }
    // 1280 exceeds the source and is never written
    assert!(!assets.join("hero-1280w.jpeg").exists());
}

#[test]
fn picture_with_typed_sources() {
    let tmp = TempDir::new().unwrap();
    write_transparent_png(&tmp.path().join("public/logo.png"), 300, 100);

    let transform = SrcsetTransform::new(options(&[200, 400])).unwrap();
    transform.configure(BuildPaths::new(tmp.path()));

    let html = concat!(
        "<picture>",
        r#"<source type="image/webp" srcset="/logo.png?srcset">"#,
        r#"<img src="/logo.png?srcset" alt="Logo">"#,
        "</picture>"
    );
    let report = transform.transform_with_report(html, "about/index.html");

    assert_eq!(report.rewritten(), 2);
    assert!(
        report
            .html
            .contains(r#"<source type="image/webp" srcset="/assets/logo-200w.webp 200w">"#),
        "{}",
        report.html
    );
    assert!(report.html.contains(r#"srcset="/assets/logo-200w.png 200w""#));
}

#[test]
fn corrupt_source_leaves_markup_alone() {
    let tmp = TempDir::new().unwrap();
    let public = tmp.path().join("public");
    fs::create_dir_all(&public).unwrap();
    fs::write(public.join("broken.jpg"), b"definitely not a jpeg").unwrap();
    write_gradient_jpeg(&public.join("ok.jpg"), 400, 400);

    let transform = SrcsetTransform::new(options(&[320])).unwrap();
    transform.configure(BuildPaths::new(tmp.path()));

    let html = r#"<img src="/broken.jpg?srcset"><img src="/ok.jpg?srcset">"#;
    let report = transform.transform_with_report(html, "index.html");

    assert!(report.html.starts_with(r#"<img src="/broken.jpg?srcset">"#));
    assert!(report.html.contains(r#"src="/assets/ok-320w.jpeg""#));
    assert_eq!(report.failed(), 1);
    assert_eq!(report.rewritten(), 1);
}

#[test]
fn excluded_document_is_not_processed() {
    let tmp = TempDir::new().unwrap();
    write_gradient_jpeg(&tmp.path().join("public/hero.jpg"), 800, 600);

    let user = UserOptions {
        exclude: Some(vec!["admin/**/*.html".into()]),
        ..options(&[320])
    };
    let transform = SrcsetTransform::new(user).unwrap();
    let paths = BuildPaths::new(tmp.path());
    transform.configure(paths.clone());

    let html = r#"<img src="/hero.jpg?srcset">"#;
    let report = transform.transform_with_report(html, "admin/dashboard.html");

    assert_eq!(report.status, DocumentStatus::Excluded);
    assert_eq!(report.html, html);
    assert!(!paths.assets_output_dir().exists());
}

#[test]
fn cached_rebuild_produces_identical_markup() {
    let tmp = TempDir::new().unwrap();
    write_gradient_jpeg(&tmp.path().join("public/hero.jpg"), 700, 350);
    let paths = BuildPaths::new(tmp.path());
    let html = r#"<img src="/hero.jpg?srcset">"#;

    let first = SrcsetTransform::new(options(&[320, 640]))
        .unwrap()
        .with_cache(RenderCache::load(paths.assets_output_dir()));
    first.configure(paths.clone());
    let first_html = first.transform_index_html(html, "index.html");
    let cache = first.cache().unwrap();
    assert_eq!(cache.stats().misses, 6);
    cache.save().unwrap();

    let second = SrcsetTransform::new(options(&[320, 640]))
        .unwrap()
        .with_cache(RenderCache::load(paths.assets_output_dir()));
    second.configure(paths.clone());
    let second_html = second.transform_index_html(html, "index.html");

    assert_eq!(first_html, second_html);
    let stats = second.cache().unwrap().stats();
    assert_eq!(stats.hits, 6);
    assert_eq!(stats.misses, 0);
}
