//! Palette extraction straight from encoded images, using the [`image`] crate for decoding.
//!
//! Images can come from local files, in-memory bytes, or base64 `data:` URIs.
//! Fetching remote images is left to the caller, who can pass the downloaded bytes to [`palette_from_memory`].

use crate::{get_palette_with, ColorFormat, DataUriError, Error, PaletteSize, PixelBuffer, Quality};
use base64::Engine;
use image::DynamicImage;
use std::path::Path;
use tracing::debug;

/// Decodes the image at `path` and extracts its palette as hex strings.
///
/// The parameters behave the same as in [`get_palette`](crate::get_palette),
/// and are validated before the image is read.
///
/// # Errors
/// Returns [`Error::InvalidParameter`] for out of range parameters
/// and [`Error::ImageLoad`] if the file cannot be read or decoded.
pub fn palette_from_path(
    path: impl AsRef<Path>,
    color_count: u32,
    quality: u32,
    ignore_white: bool,
) -> Result<Vec<String>, Error> {
    let k = PaletteSize::try_from(color_count)?;
    let quality = Quality::try_from(quality)?;
    let path = path.as_ref();
    debug!(path = %path.display(), "decoding image");
    palette_from_image(&image::open(path)?, k, quality, ignore_white)
}

/// Decodes an encoded image (PNG or JPEG) held in memory and extracts its palette as hex strings.
///
/// The parameters behave the same as in [`get_palette`](crate::get_palette),
/// and are validated before the image is decoded.
///
/// # Errors
/// Returns [`Error::InvalidParameter`] for out of range parameters
/// and [`Error::ImageLoad`] if the bytes cannot be decoded.
pub fn palette_from_memory(
    bytes: &[u8],
    color_count: u32,
    quality: u32,
    ignore_white: bool,
) -> Result<Vec<String>, Error> {
    let k = PaletteSize::try_from(color_count)?;
    let quality = Quality::try_from(quality)?;
    debug!(len = bytes.len(), "decoding image");
    palette_from_image(&image::load_from_memory(bytes)?, k, quality, ignore_white)
}

/// Decodes an image embedded in a base64 data URI, like `data:image/png;base64,iVBORw0KG...`,
/// and extracts its palette as hex strings.
///
/// The media type is not checked; the image format is guessed from the decoded bytes.
///
/// # Errors
/// Returns [`Error::InvalidParameter`] for out of range parameters
/// and [`Error::ImageLoad`] if the URI is malformed or the payload cannot be decoded.
pub fn palette_from_data_uri(
    uri: &str,
    color_count: u32,
    quality: u32,
    ignore_white: bool,
) -> Result<Vec<String>, Error> {
    let k = PaletteSize::try_from(color_count)?;
    let quality = Quality::try_from(quality)?;
    let bytes = decode_data_uri(uri)?;
    debug!(len = bytes.len(), "decoding data uri");
    palette_from_image(&image::load_from_memory(&bytes)?, k, quality, ignore_white)
}

/// Extracts the palette from either a base64 data URI (anything starting with `data:`) or a file path.
///
/// # Errors
/// See [`palette_from_data_uri`] and [`palette_from_path`].
pub fn palette_from_source(
    source: &str,
    color_count: u32,
    quality: u32,
    ignore_white: bool,
) -> Result<Vec<String>, Error> {
    if source.starts_with("data:") {
        palette_from_data_uri(source, color_count, quality, ignore_white)
    } else {
        palette_from_path(source, color_count, quality, ignore_white)
    }
}

/// Returns the bytes of a `data:[<media type>];base64,<data>` URI.
fn decode_data_uri(uri: &str) -> Result<Vec<u8>, DataUriError> {
    let (header, data) = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or(DataUriError::NotBase64)?;

    if !header.ends_with(";base64") {
        return Err(DataUriError::NotBase64);
    }

    Ok(base64::engine::general_purpose::STANDARD.decode(data.trim())?)
}

/// Converts the decoded image to RGBA and runs the palette pipeline on it.
fn palette_from_image(
    image: &DynamicImage,
    k: PaletteSize,
    quality: Quality,
    ignore_white: bool,
) -> Result<Vec<String>, Error> {
    let rgba = image.to_rgba8();
    let pixels = PixelBuffer::try_from(&rgba)?;
    Ok(get_palette_with(pixels, k, quality, ignore_white, ColorFormat::Hex))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::InvalidParameter;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn two_tone() -> RgbaImage {
        RgbaImage::from_fn(10, 10, |x, _| {
            if x < 6 {
                Rgba([0, 128, 255, 255])
            } else {
                Rgba([255, 64, 0, 255])
            }
        })
    }

    fn encode_png(image: &RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    fn data_uri(bytes: &[u8]) -> String {
        format!("data:image/png;base64,{}", base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    #[test]
    fn decodes_png_from_memory() {
        let bytes = encode_png(&two_tone());
        let palette = palette_from_memory(&bytes, 5, 1, true).unwrap();
        assert_eq!(palette, vec!["#0080ff", "#ff4000"]);
    }

    #[test]
    fn decodes_png_from_path() {
        let path = std::env::temp_dir().join(format!("swatch-load-{}.png", std::process::id()));
        two_tone().save(&path).unwrap();
        let palette = palette_from_path(&path, 1, 1, true);
        let from_source = palette_from_source(path.to_str().unwrap(), 1, 1, true);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(palette.unwrap(), vec!["#0080ff"]);
        assert_eq!(from_source.unwrap(), vec!["#0080ff"]);
    }

    #[test]
    fn decodes_png_from_data_uri() {
        let uri = data_uri(&encode_png(&two_tone()));
        assert_eq!(palette_from_data_uri(&uri, 5, 1, true).unwrap(), vec!["#0080ff", "#ff4000"]);
        assert_eq!(palette_from_source(&uri, 1, 1, true).unwrap(), vec!["#0080ff"]);
    }

    #[test]
    fn malformed_data_uri() {
        for uri in [
            "data:image/png,iVBORw0KGgo=",
            "data:image/png;base64",
            "image/png;base64,iVBORw0KGgo=",
        ] {
            assert_eq!(decode_data_uri(uri), Err(DataUriError::NotBase64), "{uri}");
        }

        assert!(matches!(decode_data_uri("data:image/png;base64,not*base64"), Err(DataUriError::Base64(_))));

        let not_an_image = data_uri(b"not an image");
        for uri in ["data:image/png;base64,not*base64", "data:text/plain,hello", not_an_image.as_str()] {
            assert!(
                matches!(palette_from_data_uri(uri, 5, 10, true), Err(Error::ImageLoad(_))),
                "{uri}"
            );
        }

        assert!(matches!(
            palette_from_data_uri("data:image/png;base64,not*base64", 0, 10, true),
            Err(Error::InvalidParameter(InvalidParameter::ColorCount(0)))
        ));
    }

    #[test]
    fn undecodable_input() {
        assert!(matches!(
            palette_from_memory(b"not an image", 5, 10, true),
            Err(Error::ImageLoad(_))
        ));

        let missing = std::env::temp_dir().join("swatch-load-missing/nothing.png");
        assert!(matches!(
            palette_from_path(missing, 5, 10, true),
            Err(Error::ImageLoad(_))
        ));
    }

    #[test]
    fn parameters_are_checked_first() {
        assert!(matches!(
            palette_from_memory(b"not an image", 0, 10, true),
            Err(Error::InvalidParameter(InvalidParameter::ColorCount(0)))
        ));
        assert!(matches!(
            palette_from_memory(b"not an image", 5, 11, true),
            Err(Error::InvalidParameter(InvalidParameter::Quality(11)))
        ));
    }
}
