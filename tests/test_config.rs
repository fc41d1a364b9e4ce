extern crate shelf_scan;

use base64::{engine::general_purpose, Engine as _};
use image::RgbImage;
use shelf_scan::common::{CropImage, LabelTable, ModelConfig, ScanConfig};
use shelf_scan::data::{DetectionPayload, OverviewImage};
use shelf_scan::detection_runners::image_ops::{self, EMPTY_CROP_TAG};

mod common;
use common::{init_logger, object};

#[test]
fn empty_json_gives_defaults() {
    let config = ScanConfig::from_json_str("{}").unwrap();
    assert_eq!(config, ScanConfig::default());
    assert_eq!(config.object_model, ModelConfig::object_model());
    assert_eq!(config.object_model.num_labels(), 30);
    assert_eq!(config.iou_threshold, 0.6);
    assert_eq!(config.dedup_distance, 0.08);
    assert_eq!(config.min_detect_interval_ms, 5000);
    assert_eq!(config.anchor_capacity, 80);
}

#[test]
fn json_overrides_single_fields() {
    let json = r#"{
        "iou_threshold": 0.45,
        "bay_model": { "channels": 5, "elements": 2100, "width": 320, "height": 320, "conf_threshold": 0.5 }
    }"#;
    let config = ScanConfig::from_json_str(json).unwrap();
    assert_eq!(config.iou_threshold, 0.45);
    assert_eq!(config.bay_model.elements, 2100);
    assert_eq!(config.bay_model.tensor_len(), 5 * 2100);
    assert_eq!(config.object_model, ModelConfig::object_model());
}

#[test]
fn invalid_values_are_rejected() {
    init_logger();
    assert!(ScanConfig::from_json_str(r#"{ "iou_threshold": 1.5 }"#).is_err());
    assert!(ScanConfig::from_json_str(r#"{ "anchor_capacity": 0 }"#).is_err());
    assert!(ScanConfig::from_json_str("not json").is_err());
    assert!(ScanConfig::new()
        .with_object_model(ModelConfig::new(4, 10, 640, 640, 0.5))
        .validate()
        .is_err());
    assert!(ScanConfig::from_json_file("/nonexistent/scan.json").is_err());
}

#[test]
fn builder_setters_override_defaults() {
    let config = ScanConfig::new()
        .with_iou_threshold(0.45)
        .with_dedup_distance(0.1)
        .with_min_detect_interval_ms(2500);
    assert_eq!(config.iou_threshold, 0.45);
    assert_eq!(config.dedup_distance, 0.1);
    assert_eq!(config.min_detect_interval_ms, 2500);
    assert!(config.validate().is_ok());
    assert!(ScanConfig::new().with_iou_threshold(-0.1).validate().is_err());
}

#[test]
fn labels_from_files() {
    init_logger();
    let dir = std::env::temp_dir().join(format!("shelf_scan_labels_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let labels = dir.join("labels.txt");
    let display = dir.join("display.txt");
    std::fs::write(&labels, "object\nlabel\n\nshelf stripping\n").unwrap();
    std::fs::write(&display, "Object\nPrice label\n").unwrap();

    let table = LabelTable::from_files(labels.to_str().unwrap(), display.to_str().unwrap()).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.get(1), ("label".to_string(), "Price label".to_string()));
    assert_eq!(table.get(2), ("shelf stripping".to_string(), "shelf stripping".to_string()));

    assert!(LabelTable::from_files(labels.to_str().unwrap(), "/nonexistent/display.txt").is_err());
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn labels_from_model_metadata() {
    let table = LabelTable::from_names_metadata("{0: 'object', 1: 'label', 2: 'shelf stripping'}").unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.get(2), ("shelf stripping".to_string(), "shelf stripping".to_string()));
    assert_eq!(table.get(7).0, "# 7");

    assert!(LabelTable::from_names_metadata("{}").is_err());
}

#[test]
fn display_defaults_to_label() {
    let table = LabelTable::from_strs(&["a", "b"], &["Alpha"]);
    assert_eq!(table.get(0), ("a".to_string(), "Alpha".to_string()));
    assert_eq!(table.get(1), ("b".to_string(), "b".to_string()));
    assert_eq!(LabelTable::bay().get(0).0, "bay");
}

#[test]
fn model_input_is_rotated_and_normalized() {
    init_logger();
    let mut frame = RgbImage::from_pixel(64, 48, image::Rgb([255, 0, 51]));
    frame.put_pixel(0, 0, image::Rgb([0, 0, 0]));

    let input = image_ops::prepare_model_input(&frame, 640, 640).unwrap();
    assert_eq!(input.image.dimensions(), (640, 640));
    assert_eq!(input.tensor.shape(), &[1, 640, 640, 3]);
    assert!(input.tensor.iter().all(|v| (0.0..=1.0).contains(v)));

    // Far from the dark corner the colour survives resizing.
    assert!((input.tensor[[0, 320, 320, 0]] - 1.0).abs() < 0.02);
    assert!(input.tensor[[0, 320, 320, 1]].abs() < 0.02);
    assert!((input.tensor[[0, 320, 320, 2]] - 0.2).abs() < 0.02);

    assert!(image_ops::prepare_model_input(&RgbImage::new(0, 0), 640, 640).is_err());
}

#[test]
fn jpeg_encoding_is_base64() {
    let image = RgbImage::from_pixel(32, 32, image::Rgb([10, 200, 30]));
    let encoded = image_ops::encode_jpeg_base64(&image, 75).unwrap();
    let bytes = general_purpose::STANDARD.decode(encoded).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
}

#[test]
fn crops_are_clamped() {
    let image = RgbImage::from_pixel(100, 100, image::Rgb([10, 200, 30]));
    assert!(matches!(image_ops::crop_encoded(&image, 90., 90., 50., 50., 75), CropImage::Jpeg(_)));
    assert!(matches!(image_ops::crop_encoded(&image, -20., -20., 40., 40., 75), CropImage::Jpeg(_)));
    assert_eq!(
        image_ops::crop_encoded(&image, 120., 0., 10., 10., 75),
        CropImage::Tag(EMPTY_CROP_TAG.to_string())
    );
}

#[test]
fn payload_serializes() {
    let payload = DetectionPayload::new(vec![object("cereal")], OverviewImage::Jpeg("abc".to_string()));
    let json = payload.to_json().unwrap();
    assert!(json.contains("cereal"));
    let back: DetectionPayload = serde_json::from_str(&json).unwrap();
    assert_eq!(back, payload);

    assert!(DetectionPayload::end().is_end());
}
