extern crate shelf_scan;

use image::RgbImage;
use ndarray::{Array, Ix4};
use shelf_scan::common::{CropImage, LabelTable, ModelConfig};
use shelf_scan::detection_runners::bay_matcher::BAY_CROP_TAG;
use shelf_scan::detection_runners::image_ops::EMPTY_CROP_TAG;
use shelf_scan::detection_runners::nms::apply_nms;
use shelf_scan::detection_runners::{BayEndpointMatcher, InferenceBackend, TensorDecoder};

mod common;
use common::{init_logger, small_bay_model, small_config, small_labels, small_object_model, TensorBuilder};

fn assert_close(a: f32, b: f32) {
    assert!((a - b).abs() < 1e-3, "{} != {}", a, b);
}

#[test]
fn single_element_above_threshold() {
    init_logger();
    let model = small_object_model();
    let raw = TensorBuilder::new(&model)
        .element(0, [0.5, 0.5, 0.25, 0.5], 2, 0.9)
        .build();

    let decoder = TensorDecoder::new(model, small_labels());
    let detections = decoder.decode(&raw, 1280, 960, None);

    assert_eq!(detections.len(), 1);
    let d = &detections[0];
    assert_eq!(d.label(), "shelf stripping");
    assert_eq!(d.display_label(), "Shelf stripping");
    assert_eq!(d.class_id(), 2);
    assert_close(d.confidence(), 0.9);
    assert_close(d.bbox().left(), 480.);
    assert_close(d.bbox().top(), 240.);
    assert_close(d.bbox().right(), 800.);
    assert_close(d.bbox().bottom(), 720.);
    assert_eq!(d.crop(), &CropImage::Tag(EMPTY_CROP_TAG.to_string()));
    assert!(d.world_position().is_none());

    // A lone candidate passes suppression untouched.
    assert_eq!(apply_nms(detections.clone(), 0.6), detections);
}

#[test]
fn threshold_is_strict() {
    let model = small_object_model();
    let raw = TensorBuilder::new(&model)
        .element(3, [0.5, 0.5, 0.1, 0.1], 0, 0.65)
        .element(4, [0.5, 0.5, 0.1, 0.1], 1, 0.6501)
        .build();

    let detections = TensorDecoder::new(model, small_labels()).decode(&raw, 640, 640, None);
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].label(), "label");
}

#[test]
fn first_label_wins_on_equal_scores() {
    let model = small_object_model();
    let raw = TensorBuilder::new(&model)
        .element(1, [0.5, 0.5, 0.1, 0.1], 1, 0.8)
        .score(1, 2, 0.8)
        .build();

    let detections = TensorDecoder::new(model, small_labels()).decode(&raw, 640, 640, None);
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].label(), "label");
}

#[test]
fn malformed_tensors_decode_to_nothing() {
    init_logger();
    let model = small_object_model();
    let decoder = TensorDecoder::new(model, small_labels());

    assert!(decoder.decode(&[], 640, 640, None).is_empty());
    assert!(decoder.decode(&[0.9], 640, 640, None).is_empty());
    assert!(decoder.decode(&vec![0.9; model.tensor_len() - 1], 640, 640, None).is_empty());
}

#[test]
fn models_without_label_channels_decode_to_nothing() {
    init_logger();
    let model = ModelConfig::new(4, 2, 640, 640, 0.5);
    let raw = vec![0.9; model.tensor_len()];

    assert!(TensorDecoder::new(model, small_labels()).decode(&raw, 640, 640, None).is_empty());
    assert!(BayEndpointMatcher::new(model).decode(&raw, 640, 640).is_empty());
}

#[test]
fn element_order_is_preserved() {
    let model = small_object_model();
    let raw = TensorBuilder::new(&model)
        .element(9, [0.8, 0.5, 0.1, 0.1], 1, 0.7)
        .element(3, [0.2, 0.5, 0.1, 0.1], 0, 0.95)
        .element(12, [0.5, 0.5, 0.1, 0.1], 2, 0.99)
        .build();

    let decoder = TensorDecoder::new(model, small_labels());
    let first = decoder.decode(&raw, 640, 640, None);
    let labels: Vec<&str> = first.iter().map(|d| d.label()).collect();
    assert_eq!(labels, vec!["object", "label", "shelf stripping"]);

    // Decoding is a pure function of its inputs.
    assert_eq!(first, decoder.decode(&raw, 640, 640, None));
}

#[test]
fn unknown_label_index_gets_placeholder() {
    let model = small_object_model();
    let raw = TensorBuilder::new(&model)
        .element(0, [0.5, 0.5, 0.1, 0.1], 2, 0.9)
        .build();

    let labels = LabelTable::from_strs(&["object"], &["Object"]);
    let detections = TensorDecoder::new(model, labels).decode(&raw, 640, 640, None);
    assert_eq!(detections[0].label(), "# 2");
}

#[test]
fn crops_are_cut_from_the_source_image() {
    let model = small_object_model();
    let raw = TensorBuilder::new(&model)
        .element(0, [0.5, 0.5, 0.25, 0.5], 0, 0.9)
        .element(1, [1.5, 1.5, 0.25, 0.25], 1, 0.9)
        .element(2, [0.95, 0.95, 0.25, 0.25], 1, 0.9)
        .build();
    let source = RgbImage::from_pixel(640, 640, image::Rgb([90, 140, 200]));

    let detections = TensorDecoder::new(model, small_labels()).decode(&raw, 640, 640, Some(&source));
    assert_eq!(detections.len(), 3);
    assert!(matches!(detections[0].crop(), CropImage::Jpeg(data) if !data.is_empty()));
    // Entirely outside the image.
    assert_eq!(detections[1].crop(), &CropImage::Tag(EMPTY_CROP_TAG.to_string()));
    // Partially outside the image: clamped, still encoded.
    assert!(matches!(detections[2].crop(), CropImage::Jpeg(_)));
}

#[test]
fn bay_matcher_keeps_two_separated_endpoints() {
    init_logger();
    let model = small_bay_model();
    let raw = TensorBuilder::new(&model)
        .element(0, [0.2, 0.5, 0.05, 0.4], 0, 0.9)
        .element(1, [0.22, 0.5, 0.05, 0.4], 0, 0.95)
        .element(2, [0.7, 0.5, 0.05, 0.4], 0, 0.8)
        .element(3, [0.9, 0.5, 0.05, 0.4], 0, 0.99)
        .build();

    let endpoints = BayEndpointMatcher::new(model).decode(&raw, 640, 640);
    assert_eq!(endpoints.len(), 2);
    for endpoint in &endpoints {
        assert!(endpoint.is_bay());
        assert_eq!(endpoint.display_label(), "bay");
        assert_eq!(endpoint.crop(), &CropImage::Tag(BAY_CROP_TAG.to_string()));
    }
    assert_close(endpoints[0].bbox().cx(), 128.);
    assert_close(endpoints[1].bbox().cx(), 448.);
}

#[test]
fn bay_matcher_rejects_endpoints_inside_the_ratio_window() {
    let model = small_bay_model();
    let raw = TensorBuilder::new(&model)
        .element(0, [0.5, 0.5, 0.05, 0.4], 0, 0.9)
        .element(1, [0.45, 0.5, 0.05, 0.4], 0, 0.9)
        .element(2, [0.58, 0.5, 0.05, 0.4], 0, 0.9)
        .build();

    let endpoints = BayEndpointMatcher::new(model).decode(&raw, 640, 640);
    assert_eq!(endpoints.len(), 1);

    let wider = BayEndpointMatcher::new(model).with_ratio(0.05).decode(&raw, 640, 640);
    assert_eq!(wider.len(), 2);
}

#[test]
fn bay_matcher_ignores_malformed_output() {
    let model = ModelConfig::bay_model();
    let matcher = BayEndpointMatcher::new(model);
    assert!(matcher.decode(&[0.5], 640, 640).is_empty());
    assert!(matcher.decode(&[0.5; 10], 640, 640).is_empty());
}

#[test]
fn detector_runs_outside_a_session() {
    init_logger();
    let objects = TensorBuilder::new(&small_object_model())
        .element(0, [0.5, 0.5, 0.2, 0.2], 0, 0.9)
        .element(1, [0.52, 0.5, 0.2, 0.2], 0, 0.8)
        .element(2, [0.2, 0.8, 0.1, 0.05], 1, 0.85)
        .build();
    let bays = TensorBuilder::new(&small_bay_model())
        .element(0, [0.1, 0.5, 0.05, 0.8], 0, 0.9)
        .element(5, [0.9, 0.5, 0.05, 0.8], 0, 0.9)
        .build();
    let object_backend: Box<dyn InferenceBackend> = Box::new(move |input: &Array<f32, Ix4>| -> anyhow::Result<Vec<f32>> {
        assert_eq!(input.shape(), &[1, 640, 640, 3]);
        Ok(objects.clone())
    });
    let bay_backend: Box<dyn InferenceBackend> =
        Box::new(move |_: &Array<f32, Ix4>| -> anyhow::Result<Vec<f32>> { Ok(bays.clone()) });

    let detector = shelf_scan::init_detector(&small_config(), small_labels(), object_backend, bay_backend).unwrap();
    let frame = RgbImage::from_pixel(64, 48, image::Rgb([120, 80, 40]));
    let detections = shelf_scan::run_detection(&detector, frame, 1000, 1000).unwrap();

    // The overlapping 0.8 object is suppressed; bay endpoints follow the objects.
    let labels: Vec<&str> = detections.iter().map(|d| d.label()).collect();
    assert_eq!(labels, vec!["object", "label", "bay", "bay"]);
    assert_close(detections[0].confidence(), 0.9);
    assert!(matches!(detections[0].crop(), CropImage::Jpeg(_)));

    let timings = detector.timings();
    assert_eq!(timings.n(), 1);
    assert!(timings.avg() <= timings.total());
}
