//! Contains the error types returned across the crate.

use crate::{PixelLayout, MAX_COLORS, MAX_PIXELS, MAX_QUALITY, MIN_QUALITY};
use thiserror::Error;

/// The error type for palette extraction.
///
/// Every failure short-circuits the whole call, so a palette is either returned in full or not at all.
#[derive(Debug, Error)]
pub enum Error {
    /// The image source could not be read or decoded.
    #[cfg(feature = "image")]
    #[error("failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),
    /// The decoded pixels do not match the expected layout.
    #[error("failed to read pixels: {0}")]
    PixelRead(#[from] PixelReadError),
    /// A tuning parameter was outside of its supported range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(#[from] InvalidParameter),
}

/// An error for pixel buffers that cannot be interpreted with the given dimensions and layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PixelReadError {
    /// The buffer length is not `width * height * bytes_per_pixel`.
    #[error(
        "a {width}x{height} {layout} image needs {expected} bytes, but the buffer has {actual}"
    )]
    LengthMismatch {
        /// The image width in pixels.
        width: u32,
        /// The image height in pixels.
        height: u32,
        /// The pixel layout of the buffer.
        layout: PixelLayout,
        /// The number of bytes implied by the dimensions and layout.
        expected: u64,
        /// The actual length of the buffer.
        actual: usize,
    },
    /// The image has more pixels than [`MAX_PIXELS`].
    #[error("image has {0} pixels, above the maximum of {max}", max = MAX_PIXELS)]
    TooManyPixels(u64),
}

/// An error for image sources given as data URIs that cannot be turned into encoded bytes.
///
/// It is reported as the source of an [`Error::ImageLoad`] decoding error.
#[cfg(feature = "image")]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataUriError {
    /// The string is not of the form `data:[<media type>];base64,<data>`.
    #[error("not a base64 data URI")]
    NotBase64,
    /// The payload is not valid base64.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[cfg(feature = "image")]
impl From<DataUriError> for Error {
    fn from(err: DataUriError) -> Self {
        use image::error::{DecodingError, ImageError, ImageFormatHint};
        Self::ImageLoad(ImageError::Decoding(DecodingError::new(ImageFormatHint::Unknown, err)))
    }
}

/// An error for tuning parameters outside of their supported range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidParameter {
    /// The requested number of colors was `0` or above [`MAX_COLORS`].
    #[error("color count must be between 1 and {max}, got {0}", max = MAX_COLORS)]
    ColorCount(u32),
    /// The quality was outside of [`MIN_QUALITY`]`..=`[`MAX_QUALITY`].
    #[error("quality must be between {min} and {max}, got {0}", min = MIN_QUALITY, max = MAX_QUALITY)]
    Quality(u32),
}

/// An error returned when parsing a color string fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseColorError {
    /// The string started with `#` but was not a 6 digit hex code.
    #[error("invalid hex color `{0}`")]
    InvalidHex(String),
    /// The string was not of the form `rgb(r, g, b)` with components in `0..=255`.
    #[error("invalid rgb color `{0}`")]
    InvalidRgb(String),
}
