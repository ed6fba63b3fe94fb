//! Encoder built on the image, webp and ravif crates

use std::io::Cursor;

use anyhow::{anyhow, Result};
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngDecoder, PngEncoder};
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, DynamicImage, Frame, GenericImageView};
use imgu_core::ImageFormat;

use crate::codec::{EncodeParams, ImageCodec};

/// Native codec used in production
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCodec;

impl NativeCodec {
    pub fn new() -> Self {
        NativeCodec
    }

    fn try_encode(&self, input: &[u8], params: &EncodeParams) -> Result<Vec<u8>> {
        if params.animated && params.format.supports_animation() {
            let frames = decode_frames(input)?;
            if frames.len() > 1 {
                return match params.format {
                    ImageFormat::Gif => encode_gif_frames(frames),
                    _ => encode_webp_frames(frames, params),
                };
            }
        }

        // Multi-frame sources keep only their first frame here
        let img = image::load_from_memory(input)?;
        encode_still(&img, params)
    }
}

impl ImageCodec for NativeCodec {
    fn encode(&self, input: &[u8], params: &EncodeParams) -> Option<Vec<u8>> {
        let start = std::time::Instant::now();
        match self.try_encode(input, params) {
            Ok(output) => {
                tracing::debug!(
                    format = %params.format,
                    animated = params.animated,
                    input_bytes = input.len(),
                    output_bytes = output.len(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Image encoded"
                );
                Some(output)
            }
            Err(e) => {
                tracing::warn!(
                    format = %params.format,
                    animated = params.animated,
                    error = %e,
                    "Image encoding failed"
                );
                None
            }
        }
    }
}

fn decode_frames(input: &[u8]) -> Result<Vec<Frame>> {
    let cursor = Cursor::new(input);
    let frames = match ImageFormat::sniff(input) {
        Some(ImageFormat::Gif) => GifDecoder::new(cursor)?.into_frames().collect_frames()?,
        Some(ImageFormat::Webp) => WebPDecoder::new(cursor)?.into_frames().collect_frames()?,
        Some(ImageFormat::Png) => PngDecoder::new(cursor)?.apng()?.into_frames().collect_frames()?,
        other => return Err(anyhow!("no animation support for {:?}", other)),
    };
    Ok(frames)
}

fn encode_gif_frames(frames: Vec<Frame>) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buffer);
        encoder.set_repeat(Repeat::Infinite)?;
        encoder.encode_frames(frames)?;
    }
    Ok(buffer)
}

fn encode_webp_frames(frames: Vec<Frame>, params: &EncodeParams) -> Result<Vec<u8>> {
    let (width, height) = frames
        .first()
        .map(|frame| frame.buffer().dimensions())
        .ok_or_else(|| anyhow!("animation has no frames"))?;
    let config = webp_config(params)?;

    // Frames borrow their pixel buffers, which must outlive the encoder
    let timestamps = frame_timestamps(&frames);

    let mut encoder = webp::AnimEncoder::new(width, height, &config);
    for (frame, timestamp) in frames.iter().zip(timestamps) {
        let buffer = frame.buffer();
        if buffer.dimensions() != (width, height) {
            return Err(anyhow!("animation frames differ in size"));
        }
        encoder.add_frame(webp::AnimFrame::from_rgba(
            buffer.as_raw(),
            width,
            height,
            timestamp,
        ));
    }

    Ok(encoder.encode().to_vec())
}

/// Start time of each frame in milliseconds. Absurd delays saturate
/// instead of wrapping.
fn frame_timestamps(frames: &[Frame]) -> Vec<i32> {
    let mut timestamps = Vec::with_capacity(frames.len());
    let mut elapsed_ms = 0i32;
    for frame in frames {
        timestamps.push(elapsed_ms);
        let (numer, denom) = frame.delay().numer_denom_ms();
        let delay_ms = i32::try_from(numer / denom.max(1)).unwrap_or(i32::MAX);
        elapsed_ms = elapsed_ms.saturating_add(delay_ms);
    }
    timestamps
}

fn encode_still(img: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>> {
    match params.format {
        ImageFormat::Png => encode_png(img, params.effort),
        ImageFormat::Jpeg => encode_jpeg(img, params),
        ImageFormat::Gif => {
            let mut buffer = Vec::new();
            img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Gif)?;
            Ok(buffer)
        }
        ImageFormat::Webp => encode_webp(img, params),
        ImageFormat::Avif => encode_avif(img, params),
    }
}

fn encode_png(img: &DynamicImage, effort: u8) -> Result<Vec<u8>> {
    let compression = match effort {
        0..=3 => CompressionType::Fast,
        4..=7 => CompressionType::Default,
        _ => CompressionType::Best,
    };
    let mut buffer = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut buffer, compression, FilterType::Adaptive);
    img.write_with_encoder(encoder)?;
    Ok(buffer)
}

fn encode_jpeg(img: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>> {
    // JPEG has no lossless mode in this encoder; top quality is the closest
    let quality = if params.lossless { 100 } else { params.quality.max(1) };
    let rgb_img = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    rgb_img.write_with_encoder(encoder)?;
    Ok(buffer)
}

fn webp_config(params: &EncodeParams) -> Result<webp::WebPConfig> {
    let mut config =
        webp::WebPConfig::new().map_err(|_| anyhow!("failed to initialize WebP config"))?;
    config.lossless = i32::from(params.lossless);
    config.quality = f32::from(params.quality);
    // libwebp methods run 0..=6
    config.method = (i32::from(params.effort) * 6 + 5) / 10;
    Ok(config)
}

fn encode_webp(img: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>> {
    let (width, height) = img.dimensions();
    let rgba_img = img.to_rgba8();
    let config = webp_config(params)?;

    let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
    let data = encoder
        .encode_advanced(&config)
        .map_err(|e| anyhow!("WebP encoding failed: {:?}", e))?;
    Ok(data.to_vec())
}

fn encode_avif(img: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>> {
    let (width, height) = img.dimensions();
    let quality = if params.lossless { 100.0 } else { f32::from(params.quality) };
    // ravif speed runs 1 (slowest) ..= 10 (fastest)
    let speed = (10 - params.effort).max(1);

    let rgba_img = img.to_rgba8();
    let pixels: Vec<rgb::RGBA8> = rgba_img
        .as_raw()
        .chunks_exact(4)
        .map(|chunk| rgb::RGBA8::new(chunk[0], chunk[1], chunk[2], chunk[3]))
        .collect();
    let img_buf = ravif::Img::new(pixels.as_slice(), width as usize, height as usize);

    let encoder = ravif::Encoder::new()
        .with_quality(quality)
        .with_alpha_quality(quality)
        .with_speed(speed);

    let avif_data = encoder.encode_rgba(img_buf)?;
    Ok(avif_data.avif_file)
}
