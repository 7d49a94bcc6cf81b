use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use labelocr::{
    annotation::{unescape_description, AnnotationDocument},
    config::AppConfig,
    detection::BoxMode,
    pipeline::{output_paths, run_batch, BatchSummary},
    services::ocr::{sidecar::Sidecar, DetectorList},
};
use serde_json::{json, Value};

fn config() -> AppConfig {
    AppConfig {
        detector: DetectorList::Sidecar,
        min_height: 0,
        min_width: 0,
        ..AppConfig::default()
    }
}

fn write_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    image::RgbImage::new(width, height).save(&path).unwrap();
    path
}

fn write_detections(image: &Path, detections: Value) {
    std::fs::write(Sidecar::detections_path(image), detections.to_string()).unwrap();
}

fn quad(x1: f64, y1: f64, x2: f64, y2: f64) -> Value {
    json!([[x1, y1], [x2, y1], [x2, y2], [x1, y2]])
}

fn read_document(image: &Path) -> AnnotationDocument {
    let (json_path, _) = output_paths(image);
    serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap()
}

fn read_listing(image: &Path) -> String {
    let (_, txt_path) = output_paths(image);
    std::fs::read_to_string(txt_path).unwrap()
}

#[test]
fn annotates_touching_words_as_one_region() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), "greeting.png", 40, 30);
    write_detections(
        &image,
        json!([
            {"box": quad(0.0, 0.0, 3.0, 20.0), "text": "Hello", "confidence": 0.9},
            {"box": quad(3.0, 0.0, 9.0, 20.0), "text": "World"},
            {"box": quad(20.0, 25.0, 30.0, 29.0), "text": "say \"hi\"\nbye"},
        ]),
    );

    let summary = run_batch(&config(), &mut Sidecar, dir.path()).unwrap();
    assert_eq!(
        summary,
        BatchSummary {
            processed: 1,
            failed: 0,
            regions: 2
        }
    );

    let doc = read_document(&image);
    assert_eq!(doc.version, "4.5.6");
    assert_eq!(doc.image_path, "greeting.png");
    assert_eq!((doc.image_width, doc.image_height), (40, 30));
    assert_eq!(doc.shapes.len(), 2);
    assert_eq!(doc.shapes[0].label, "1");
    assert_eq!(doc.shapes[0].description, "Hello World");
    assert_eq!(
        serde_json::to_value(doc.shapes[0].points).unwrap(),
        json!([[0, 0], [9, 20]])
    );
    assert_eq!(doc.shapes[1].label, "2");
    assert_eq!(doc.shapes[1].shape_type, "rectangle");
    assert_eq!(
        unescape_description(&doc.shapes[1].description).unwrap(),
        "say \"hi\"\nbye"
    );

    let png = STANDARD.decode(doc.image_data.unwrap()).unwrap();
    let decoded = image::load_from_memory(&png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (40, 30));

    assert_eq!(read_listing(&image), "Hello World\nsay \\\"hi\\\"\\nbye\n");
}

#[test]
fn thresholds_apply_before_merging() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), "page.png", 200, 100);
    write_detections(
        &image,
        json!([
            {"box": quad(0.0, 0.0, 100.0, 20.0), "text": "kept"},
            {"box": quad(100.0, 0.0, 120.0, 20.0), "text": "narrow"},
            {"box": quad(0.0, 50.0, 150.0, 55.0), "text": "short"},
        ]),
    );
    let config = AppConfig {
        min_height: 12,
        min_width: 70,
        ..config()
    };

    run_batch(&config, &mut Sidecar, dir.path()).unwrap();

    let doc = read_document(&image);
    assert_eq!(doc.shapes.len(), 1);
    assert_eq!(doc.shapes[0].description, "kept");
    assert_eq!(
        serde_json::to_value(doc.shapes[0].points).unwrap(),
        json!([[0, 0], [100, 20]])
    );
}

#[test]
fn no_detections_gives_empty_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), "blank.png", 10, 10);
    write_detections(&image, json!([]));

    let config = AppConfig {
        embed_image_data: false,
        ..config()
    };
    let summary = run_batch(&config, &mut Sidecar, dir.path()).unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.regions, 0);

    let doc = read_document(&image);
    assert!(doc.shapes.is_empty());
    assert_eq!(doc.image_data, None);
    assert_eq!(read_listing(&image), "");
}

#[test]
fn failing_images_do_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();

    let broken = dir.path().join("a_broken.png");
    std::fs::write(&broken, b"definitely not a png").unwrap();
    write_detections(&broken, json!([]));

    // no detections file at all
    let orphan = write_image(dir.path(), "b_orphan.png", 10, 10);

    let inverted = write_image(dir.path(), "c_inverted.png", 50, 50);
    write_detections(
        &inverted,
        json!([{"box": [[40, 40], [0, 40], [0, 0], [40, 0]], "text": "upside down"}]),
    );

    let good = write_image(dir.path(), "d_good.png", 50, 50);
    write_detections(&good, json!([{"box": quad(1.0, 1.0, 20.0, 20.0), "text": "fine"}]));

    let config = AppConfig {
        box_mode: BoxMode::Diagonal,
        parallel_jobs: 2,
        ..config()
    };
    let summary = run_batch(&config, &mut Sidecar, dir.path()).unwrap();
    assert_eq!(
        summary,
        BatchSummary {
            processed: 1,
            failed: 3,
            regions: 1
        }
    );

    for failed in [&broken, &orphan, &inverted] {
        let (json_path, txt_path) = output_paths(failed);
        assert!(!json_path.exists(), "{} was written", json_path.display());
        assert!(!txt_path.exists(), "{} was written", txt_path.display());
    }
    assert_eq!(read_listing(&good), "fine\n");
}

#[test]
fn box_spanning_the_coordinate_range_does_not_abort_the_batch() {
    let dir = tempfile::tempdir().unwrap();

    let huge = write_image(dir.path(), "a_huge.png", 20, 20);
    write_detections(
        &huge,
        json!([{"box": [[-1e12, 0], [1e12, 0], [1e12, 20], [-1e12, 20]], "text": "everywhere"}]),
    );
    let empty = write_image(dir.path(), "b_empty.png", 20, 20);
    write_detections(&empty, json!([]));

    let config = AppConfig {
        detector: DetectorList::Sidecar,
        ..AppConfig::default()
    };
    let summary = run_batch(&config, &mut Sidecar, dir.path()).unwrap();
    assert_eq!(
        summary,
        BatchSummary {
            processed: 2,
            failed: 0,
            regions: 1
        }
    );

    let doc = read_document(&huge);
    assert_eq!(doc.shapes[0].description, "everywhere");
    assert_eq!(
        serde_json::to_value(doc.shapes[0].points).unwrap(),
        json!([[i32::MIN, 0], [i32::MAX, 20]])
    );
    assert_eq!(read_listing(&empty), "");
}

#[test]
fn non_png_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();

    let summary = run_batch(&config(), &mut Sidecar, dir.path()).unwrap();
    assert_eq!(summary, BatchSummary::default());
}
