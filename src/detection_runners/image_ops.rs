//! Frame preprocessing and image encoding helpers.

use std::io::Cursor;
use anyhow::{bail, Result};
use base64::{engine::general_purpose, Engine as _};
use fast_image_resize::{images::Image as FirImage, pixels::PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::{Array, Ix4};
use crate::common::CropImage;

pub const EMPTY_CROP_TAG: &str = "EmptyCrop";

/// The model-space image and the normalized tensor built from it.
#[derive(Debug, Clone)]
pub struct ModelInput {
    /// Resized and rotated frame; crops are cut from this image.
    pub image: RgbImage,
    /// NHWC `(1, height, width, 3)` tensor with channels scaled to `[0, 1]`.
    pub tensor: Array<f32, Ix4>,
}

/// Resizes the camera frame to the model resolution, rotates it 90 degrees clockwise and
/// normalizes it.
pub fn prepare_model_input(frame: &RgbImage, width: u32, height: u32) -> Result<ModelInput> {
    if frame.width() == 0 || frame.height() == 0 {
        bail!("Cannot prepare an empty frame ({}x{})", frame.width(), frame.height());
    }

    // Resize to the transposed size so the rotated result is exactly width x height.
    let resized = match resize_image(frame, height, width) {
        Ok(resized) => resized,
        Err(err) => {
            log::warn!("Failed to use `fast_image_resize` ({}). Falling back.", err);
            image::imageops::resize(frame, height, width, FilterType::Triangle)
        }
    };
    let image = image::imageops::rotate90(&resized);
    let tensor = nhwc_normalize(&image)?;

    Ok(ModelInput { image, tensor })
}

fn resize_image(frame: &RgbImage, target_w: u32, target_h: u32) -> Result<RgbImage> {
    let src = FirImage::from_vec_u8(frame.width(), frame.height(), frame.as_raw().clone(), PixelType::U8x3)?;
    let mut dst = FirImage::new(target_w, target_h, PixelType::U8x3);

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(
        fast_image_resize::FilterType::Bilinear,
    ));
    let mut resizer = Resizer::new();
    resizer.resize(&src, &mut dst, &options)?;

    match RgbImage::from_raw(target_w, target_h, dst.into_vec()) {
        Some(image) => Ok(image),
        None => bail!("Resized buffer does not match {}x{}", target_w, target_h),
    }
}

fn nhwc_normalize(img: &RgbImage) -> Result<Array<f32, Ix4>> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let buf = img.as_raw();
    if buf.len() != w * h * 3 {
        bail!("Unexpected buffer size: got {}, expected {}", buf.len(), w * h * 3);
    }

    let float_data: Vec<f32> = buf.iter().map(|&v| v as f32 / 255.0).collect();
    Ok(Array::from_shape_vec((1, h, w, 3), float_data)?)
}

/// JPEG encodes an image and returns it as standard base64.
pub fn encode_jpeg_base64(image: &RgbImage, quality: u8) -> Result<String> {
    let mut bytes = Cursor::new(Vec::new());
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
        encoder.encode_image(image)?;
    }
    Ok(general_purpose::STANDARD.encode(bytes.into_inner()))
}

/// Encodes the region `(x, y, w, h)` of `image`, clamped to its bounds.
pub fn crop_encoded(image: &RgbImage, x: f32, y: f32, w: f32, h: f32, quality: u8) -> CropImage {
    let x0 = x.max(0.).floor() as u32;
    let y0 = y.max(0.).floor() as u32;
    let x1 = ((x + w).max(0.).ceil() as u32).min(image.width());
    let y1 = ((y + h).max(0.).ceil() as u32).min(image.height());

    if x0 >= x1 || y0 >= y1 {
        return CropImage::Tag(EMPTY_CROP_TAG.to_string());
    }

    let crop = image::imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image();
    match encode_jpeg_base64(&crop, quality) {
        Ok(encoded) => CropImage::Jpeg(encoded),
        Err(err) => {
            log::warn!("Failed to encode crop: {}", err);
            CropImage::Tag(EMPTY_CROP_TAG.to_string())
        }
    }
}
