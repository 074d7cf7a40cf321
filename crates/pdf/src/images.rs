//! Export of embedded raster images.

use crate::objects::{self, as_dict, get, name, number, resolve};
use deck_core::{Error, Result};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Document, Object, Stream};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Encoded image bytes ready to be written to a file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub bytes: Vec<u8>,

    /// File extension without the dot.
    pub ext: &'static str,
}

/// File name of the `index`-th image on page `page` (zero-based).
pub fn image_file_name(page: usize, index: usize, ext: &str) -> String {
    format!("im_p{}_{}.{}", page, index, ext)
}

/// Destination for exported images.
pub trait ImageSink {
    /// Store `data` under `name`, returning the path elements should reference.
    fn save(&mut self, name: &str, data: &ImageData) -> Result<PathBuf>;
}

/// Writes images into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ImageSink for DirectorySink {
    fn save(&mut self, name: &str, data: &ImageData) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        std::fs::write(&path, &data.bytes)?;
        Ok(path)
    }
}

/// Encode an image XObject for export.
///
/// JPEG and JPEG 2000 data are kept as stored. 8-bit RGB, gray and CMYK
/// rasters are re-encoded as PNG. Anything else is an [`Error::Image`].
pub fn encode_image(doc: &Document, stream: &Stream) -> Result<ImageData> {
    match last_filter(doc, stream).as_deref() {
        Some(b"DCTDecode") => {
            return Ok(ImageData {
                bytes: stream.content.clone(),
                ext: "jpeg",
            })
        }
        Some(b"JPXDecode") => {
            return Ok(ImageData {
                bytes: stream.content.clone(),
                ext: "jpx",
            })
        }
        _ => {}
    }

    let dict = &stream.dict;
    if matches!(get(doc, dict, b"ImageMask"), Some(Object::Boolean(true))) {
        return Err(Error::Image("stencil masks are not exported".to_string()));
    }

    let dimension = |key: &[u8]| {
        get(doc, dict, key)
            .and_then(number)
            .filter(|v| *v >= 1.0)
            .map(|v| v as u32)
    };
    let (width, height) = match (dimension(b"Width"), dimension(b"Height")) {
        (Some(w), Some(h)) => (w, h),
        _ => return Err(Error::Image("missing image dimensions".to_string())),
    };

    let bits = get(doc, dict, b"BitsPerComponent").and_then(number);
    if bits != Some(8.0) {
        return Err(Error::Image(format!("unsupported bits per component: {:?}", bits)));
    }

    let components = color_components(doc, stream)?;
    let raw = objects::stream_bytes(stream)
        .ok_or_else(|| Error::Image("cannot decode image stream".to_string()))?;

    let pixels = width as usize * height as usize;
    if raw.len() < pixels * components {
        return Err(Error::Image(format!(
            "image data too short: {} bytes for {}x{}x{}",
            raw.len(),
            width,
            height,
            components
        )));
    }
    let raw = &raw[..pixels * components];

    let image = match components {
        1 => GrayImage::from_raw(width, height, raw.to_vec()).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, raw.to_vec()).map(DynamicImage::ImageRgb8),
        _ => RgbImage::from_raw(width, height, cmyk_to_rgb(raw)).map(DynamicImage::ImageRgb8),
    }
    .ok_or_else(|| Error::Image("image buffer size mismatch".to_string()))?;

    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| Error::Image(e.to_string()))?;

    Ok(ImageData { bytes, ext: "png" })
}

/// Name of the filter applied last when decoding.
fn last_filter(doc: &Document, stream: &Stream) -> Option<Vec<u8>> {
    match get(doc, &stream.dict, b"Filter")? {
        Object::Name(filter) => Some(filter.clone()),
        Object::Array(filters) => filters
            .last()
            .and_then(|f| resolve(doc, f))
            .and_then(name)
            .map(<[u8]>::to_vec),
        _ => None,
    }
}

/// Number of color components per pixel.
fn color_components(doc: &Document, stream: &Stream) -> Result<usize> {
    let space = get(doc, &stream.dict, b"ColorSpace")
        .ok_or_else(|| Error::Image("missing color space".to_string()))?;

    let (family, params) = match space {
        Object::Name(family) => (family.as_slice(), None),
        Object::Array(items) => {
            let family = items
                .first()
                .and_then(|f| resolve(doc, f))
                .and_then(name)
                .unwrap_or_default();
            (family, items.get(1))
        }
        _ => return Err(Error::Image("malformed color space".to_string())),
    };

    match family {
        b"DeviceGray" | b"CalGray" => Ok(1),
        b"DeviceRGB" | b"CalRGB" => Ok(3),
        b"DeviceCMYK" => Ok(4),
        b"ICCBased" => {
            let n = params
                .and_then(|p| as_dict(doc, p))
                .and_then(|d| get(doc, d, b"N"))
                .and_then(number);
            match n {
                Some(n) if n == 1.0 || n == 3.0 || n == 4.0 => Ok(n as usize),
                _ => Err(Error::Image("unsupported ICC profile".to_string())),
            }
        }
        other => Err(Error::Image(format!(
            "unsupported color space: {}",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn cmyk_to_rgb(raw: &[u8]) -> Vec<u8> {
    raw.chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - u16::from(px[3]);
            let channel = |c: u8| ((255 - u16::from(c)) * k / 255) as u8;
            [channel(px[0]), channel(px[1]), channel(px[2])]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn raster(color_space: Object, data: Vec<u8>) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 1,
                "BitsPerComponent" => 8,
                "ColorSpace" => color_space,
            },
            data,
        )
    }

    #[test]
    fn test_jpeg_kept_as_stored() {
        let doc = Document::with_version("1.5");
        let mut stream = raster(Object::Name(b"DeviceRGB".to_vec()), b"\xFF\xD8jpeg".to_vec());
        stream.dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));

        let data = encode_image(&doc, &stream).unwrap();
        assert_eq!(data.ext, "jpeg");
        assert_eq!(data.bytes, b"\xFF\xD8jpeg");
    }

    #[test]
    fn test_rgb_encoded_as_png() {
        let doc = Document::with_version("1.5");
        let stream = raster(Object::Name(b"DeviceRGB".to_vec()), vec![255, 0, 0, 0, 0, 255]);

        let data = encode_image(&doc, &stream).unwrap();
        assert_eq!(data.ext, "png");
        assert!(data.bytes.starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_cmyk_conversion() {
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 0, 255, 0, 0, 0]), vec![255, 255, 255, 0, 255, 255]);
    }

    #[test]
    fn test_unsupported_color_space() {
        let doc = Document::with_version("1.5");
        let stream = raster(
            Object::Array(vec![Object::Name(b"Indexed".to_vec())]),
            vec![0, 1],
        );
        assert!(matches!(encode_image(&doc, &stream), Err(Error::Image(_))));
    }

    #[test]
    fn test_short_data_rejected() {
        let doc = Document::with_version("1.5");
        let stream = raster(Object::Name(b"DeviceGray".to_vec()), vec![0]);
        assert!(encode_image(&doc, &stream).is_err());
    }

    #[test]
    fn test_directory_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("images"));
        let data = ImageData {
            bytes: b"abc".to_vec(),
            ext: "jpeg",
        };

        let path = sink.save(&image_file_name(2, 0, data.ext), &data).unwrap();
        assert_eq!(path, dir.path().join("images").join("im_p2_0.jpeg"));
        assert_eq!(std::fs::read(path).unwrap(), b"abc");
    }
}
