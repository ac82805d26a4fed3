//! Keeps inline images attached to social posts under a storage ceiling.

use std::io::Cursor;

use base64::Engine;
use bytes::Bytes;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

/// Just under the 1 MiB document limit of the downstream store.
pub const MAX_INLINE_IMAGE_BYTES: usize = 1000 * 1024;
pub const MAX_WIDTH: u32 = 1920;
pub const MAX_HEIGHT: u32 = 1080;
pub const JPEG_QUALITY: u8 = 70;

/// Decoded bytes per base64 character.
const BASE64_RATIO: f64 = 0.75;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("malformed data URI: {0}")]
    MalformedDataUri(&'static str),
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("could not decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("could not re-encode image: {0}")]
    Encode(#[source] image::ImageError),
    #[error(
        "Even after compression, the image ({:.2} MB) is still too large. Please use a smaller image or generate the text and upload the image manually.",
        megabytes(.approximate_bytes)
    )]
    TooLarge { approximate_bytes: usize, ceiling: usize },
}

fn megabytes(bytes: &usize) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0)
}

/// A parsed `data:<mime>;base64,<payload>` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Bytes,
}

impl InlineImage {
    pub fn parse(uri: &str) -> Result<Self, NormalizeError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or(NormalizeError::MalformedDataUri("missing data: scheme"))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or(NormalizeError::MalformedDataUri("missing payload separator"))?;
        let mime_type = meta
            .strip_suffix(";base64")
            .ok_or(NormalizeError::MalformedDataUri("payload is not base64"))?;
        let data = base64::engine::general_purpose::STANDARD.decode(payload.trim())?;
        Ok(Self {
            mime_type: if mime_type.is_empty() { "application/octet-stream".into() } else { mime_type.to_string() },
            data: Bytes::from(data),
        })
    }

    /// Base64 payload without the `data:` header.
    pub fn base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64())
    }
}

/// Approximate decoded size of an encoded representation.
pub fn approximate_size(representation: &str) -> usize {
    (representation.len() as f64 * BASE64_RATIO) as usize
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Normalized {
    Unchanged {
        src: String,
    },
    Compressed {
        src: String,
        original_bytes: usize,
        compressed_bytes: usize,
    },
}

impl Normalized {
    pub fn src(&self) -> &str {
        match self {
            Normalized::Unchanged { src } | Normalized::Compressed { src, .. } => src,
        }
    }

    pub fn into_src(self) -> String {
        match self {
            Normalized::Unchanged { src } | Normalized::Compressed { src, .. } => src,
        }
    }
}

/// Passes `src` through when it fits under `ceiling`; otherwise makes exactly
/// one downscale + JPEG pass and fails if that is still too big.
pub fn normalize_inline_image(src: &str, ceiling: usize) -> Result<Normalized, NormalizeError> {
    if !src.starts_with("data:") {
        return Ok(Normalized::Unchanged { src: src.to_string() });
    }
    let original_bytes = approximate_size(src);
    if original_bytes <= ceiling {
        return Ok(Normalized::Unchanged { src: src.to_string() });
    }

    info!(
        original_kb = original_bytes / 1024,
        ceiling_kb = ceiling / 1024,
        "inline image exceeds ceiling, compressing"
    );
    let inline = InlineImage::parse(src)?;
    let decoded = image::load_from_memory(&inline.data).map_err(NormalizeError::Decode)?;
    let compressed = compress(&decoded)?.to_data_uri();
    let compressed_bytes = approximate_size(&compressed);

    if compressed_bytes > ceiling {
        warn!(compressed_kb = compressed_bytes / 1024, "image still too large after compression");
        return Err(NormalizeError::TooLarge { approximate_bytes: compressed_bytes, ceiling });
    }
    info!(compressed_kb = compressed_bytes / 1024, "image compressed");
    Ok(Normalized::Compressed { src: compressed, original_bytes, compressed_bytes })
}

/// Largest size with the same aspect that fits inside `MAX_WIDTH`×`MAX_HEIGHT`.
pub fn fit_within(width: u32, height: u32) -> (u32, u32) {
    let scale = f64::min(
        1.0,
        f64::min(MAX_WIDTH as f64 / width as f64, MAX_HEIGHT as f64 / height as f64),
    );
    if scale >= 1.0 {
        return (width, height);
    }
    let w = ((width as f64 * scale).round() as u32).clamp(1, MAX_WIDTH);
    let h = ((height as f64 * scale).round() as u32).clamp(1, MAX_HEIGHT);
    (w, h)
}

fn compress(img: &DynamicImage) -> Result<InlineImage, NormalizeError> {
    let (w, h) = fit_within(img.width(), img.height());
    let resized = if (w, h) == (img.width(), img.height()) {
        img.to_rgb8()
    } else {
        img.resize_exact(w, h, FilterType::Triangle).to_rgb8()
    };

    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    resized.write_with_encoder(encoder).map_err(NormalizeError::Encode)?;
    Ok(InlineImage {
        mime_type: "image/jpeg".to_string(),
        data: Bytes::from(buf.into_inner()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn png_data_uri(img: &RgbImage) -> String {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        InlineImage { mime_type: "image/png".into(), data: Bytes::from(buf.into_inner()) }.to_data_uri()
    }

    fn noise(width: u32, height: u32) -> RgbImage {
        let mut rng = StdRng::seed_from_u64(7);
        RgbImage::from_fn(width, height, |_, _| Rgb([rng.gen(), rng.gen(), rng.gen()]))
    }

    #[test]
    fn small_image_is_returned_byte_identical() {
        let uri = png_data_uri(&RgbImage::from_pixel(8, 8, Rgb([10, 200, 30])));
        let out = normalize_inline_image(&uri, MAX_INLINE_IMAGE_BYTES).unwrap();
        assert_eq!(out, Normalized::Unchanged { src: uri.clone() });
        assert_eq!(out.src().as_bytes(), uri.as_bytes());
    }

    #[test]
    fn hosted_urls_pass_through() {
        let out = normalize_inline_image("https://cdn.example/big.png", 1).unwrap();
        assert_eq!(out.into_src(), "https://cdn.example/big.png");
    }

    #[test]
    fn oversized_image_is_compressed_and_still_decodes() {
        // random noise barely compresses as PNG but JPEG q70 shrinks it well
        let uri = png_data_uri(&noise(400, 300));
        let original = approximate_size(&uri);
        let ceiling = original * 9 / 10;

        let out = normalize_inline_image(&uri, ceiling).unwrap();
        let Normalized::Compressed { src, original_bytes, compressed_bytes } = out else {
            panic!("expected compression");
        };
        assert_eq!(original_bytes, original);
        assert!(compressed_bytes <= ceiling);
        assert!(src.len() < uri.len());
        assert!(src.starts_with("data:image/jpeg;base64,"));

        let inline = InlineImage::parse(&src).unwrap();
        let decoded = image::load_from_memory(&inline.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (400, 300));
    }

    #[test]
    fn still_too_large_after_one_pass_fails() {
        let uri = png_data_uri(&noise(200, 200));
        let err = normalize_inline_image(&uri, 1024).unwrap_err();
        assert!(matches!(err, NormalizeError::TooLarge { ceiling: 1024, .. }));
        assert!(err.to_string().contains("still too large"));
    }

    #[test]
    fn garbage_is_reported_not_passed_through() {
        let uri = format!("data:image/png;base64,{}", "A".repeat(4000));
        assert!(matches!(normalize_inline_image(&uri, 10), Err(NormalizeError::Decode(_))));
        assert!(matches!(
            normalize_inline_image("data:image/png,plain", 1),
            Err(NormalizeError::MalformedDataUri(_))
        ));
    }

    #[test]
    fn dimensions_fit_both_bounds() {
        assert_eq!(fit_within(800, 600), (800, 600));
        assert_eq!(fit_within(3840, 2160), (1920, 1080));
        assert_eq!(fit_within(3000, 2000), (1620, 1080));
        assert_eq!(fit_within(1000, 4000), (270, 1080));
        let (w, h) = fit_within(5000, 1000);
        assert_eq!((w, h), (1920, 384));
    }
}
