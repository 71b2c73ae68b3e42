use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use base64::{Engine as _, engine::general_purpose};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use image::{ImageError, RgbaImage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canvas::{BYTES_PER_PIXEL, MAX_DIMENSION, PixelBuffer};
use crate::components::tools::{DEFAULT_TOOL_INDEX, ToolOptions};

// ============================================================================
// PORTABLE BITMAP FORMAT
// ============================================================================

/// `{ "width", "height", "data" }` where `data` is base64 of the
/// zlib-compressed RGBA bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortableBitmap {
    pub width: u32,
    pub height: u32,
    pub data: String,
}

/// Why a portable bitmap could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortableError {
    Json(String),
    Base64(String),
    Compression(String),
    Dimensions { width: u32, height: u32 },
    Length { expected: usize, actual: usize },
}

impl std::fmt::Display for PortableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortableError::Json(e) => write!(f, "JSON error: {}", e),
            PortableError::Base64(e) => write!(f, "base64 error: {}", e),
            PortableError::Compression(e) => write!(f, "decompression error: {}", e),
            PortableError::Dimensions { width, height } => write!(
                f,
                "dimensions {}×{} outside 1..={}",
                width, height, MAX_DIMENSION
            ),
            PortableError::Length { expected, actual } => write!(
                f,
                "decompressed {} bytes, expected {}",
                actual, expected
            ),
        }
    }
}

impl std::error::Error for PortableError {}

impl From<serde_json::Error> for PortableError {
    fn from(e: serde_json::Error) -> Self {
        PortableError::Json(e.to_string())
    }
}

impl From<base64::DecodeError> for PortableError {
    fn from(e: base64::DecodeError) -> Self {
        PortableError::Base64(e.to_string())
    }
}

fn compress(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(bytes.len() / 4), Compression::default());
    encoder
        .write_all(bytes)
        .and_then(|_| encoder.finish())
        .expect("zlib into a Vec cannot fail")
}

/// Inflate at most `limit + 1` bytes so an oversized stream is detected
/// without being fully expanded.
fn decompress(bytes: &[u8], limit: usize) -> Result<Vec<u8>, PortableError> {
    let mut out = Vec::with_capacity(limit);
    ZlibDecoder::new(bytes)
        .take(limit as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| PortableError::Compression(e.to_string()))?;
    Ok(out)
}

fn valid_dimension(v: u32) -> bool {
    (1..=MAX_DIMENSION).contains(&v)
}

impl PixelBuffer {
    pub fn to_portable(&self) -> PortableBitmap {
        PortableBitmap {
            width: self.width(),
            height: self.height(),
            data: general_purpose::STANDARD.encode(compress(self.as_raw())),
        }
    }

    /// Strict decode reporting the reason for failure.
    pub fn decode_portable(portable: &PortableBitmap) -> Result<PixelBuffer, PortableError> {
        let (width, height) = (portable.width, portable.height);
        if !valid_dimension(width) || !valid_dimension(height) {
            return Err(PortableError::Dimensions { width, height });
        }
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        let compressed = general_purpose::STANDARD.decode(portable.data.as_bytes())?;
        let raw = decompress(&compressed, expected)?;
        if raw.len() != expected {
            return Err(PortableError::Length {
                expected,
                actual: raw.len(),
            });
        }
        PixelBuffer::from_raw(width, height, raw).map_err(|_| PortableError::Length {
            expected,
            actual: expected,
        })
    }

    /// Lenient decode: any problem is logged and reported as `None`.
    pub fn from_portable(portable: &PortableBitmap) -> Option<PixelBuffer> {
        match Self::decode_portable(portable) {
            Ok(buffer) => Some(buffer),
            Err(e) => {
                log_warn!("Rejected portable bitmap: {}", e);
                None
            }
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.to_portable()).expect("portable bitmap always serializes")
    }

    pub fn decode_json(json: &str) -> Result<PixelBuffer, PortableError> {
        let portable: PortableBitmap = serde_json::from_str(json)?;
        Self::decode_portable(&portable)
    }

    pub fn from_json(json: &str) -> Option<PixelBuffer> {
        match Self::decode_json(json) {
            Ok(buffer) => Some(buffer),
            Err(e) => {
                log_warn!("Rejected portable bitmap JSON: {}", e);
                None
            }
        }
    }
}

// ============================================================================
// PNG IMPORT / EXPORT
// ============================================================================

/// Error type for session and image file operations
#[derive(Debug)]
pub enum SessionError {
    Io(std::io::Error),
    Json(String),
    Image(String),
    InvalidBitmap(String),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Io(e) => write!(f, "I/O error: {}", e),
            SessionError::Json(e) => write!(f, "JSON error: {}", e),
            SessionError::Image(e) => write!(f, "image error: {}", e),
            SessionError::InvalidBitmap(e) => write!(f, "invalid bitmap: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        SessionError::Io(e)
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::Json(e.to_string())
    }
}

impl From<ImageError> for SessionError {
    fn from(e: ImageError) -> Self {
        SessionError::Image(e.to_string())
    }
}

impl From<PortableError> for SessionError {
    fn from(e: PortableError) -> Self {
        SessionError::InvalidBitmap(e.to_string())
    }
}

impl PixelBuffer {
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_raw(self.width(), self.height(), self.as_raw().to_vec())
            .expect("buffer length always matches its dimensions")
    }

    /// Import an `image` buffer; images larger than the editor supports are
    /// rejected rather than cropped.
    pub fn from_rgba_image(img: &RgbaImage) -> Result<PixelBuffer, SessionError> {
        let (width, height) = img.dimensions();
        if !valid_dimension(width) || !valid_dimension(height) {
            return Err(PortableError::Dimensions { width, height }.into());
        }
        PixelBuffer::from_raw(width, height, img.as_raw().clone())
            .map_err(|e| SessionError::InvalidBitmap(e.to_string()))
    }
}

pub fn export_png(buffer: &PixelBuffer, path: &Path) -> Result<(), SessionError> {
    buffer
        .to_rgba_image()
        .save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

pub fn import_png(path: &Path) -> Result<PixelBuffer, SessionError> {
    let img = image::open(path)?.into_rgba8();
    PixelBuffer::from_rgba_image(&img)
}

// ============================================================================
// SESSION DOCUMENT
// ============================================================================

fn default_tool_index() -> i64 {
    DEFAULT_TOOL_INDEX
}

/// On-disk editing session: the logo, its undo snapshots (oldest first) and
/// the tool configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionDocument {
    pub id: Uuid,
    pub logo: PortableBitmap,
    #[serde(default)]
    pub history: Vec<PortableBitmap>,
    #[serde(default)]
    pub options: ToolOptions,
    #[serde(default = "default_tool_index")]
    pub tool: i64,
}

pub fn save_session(doc: &SessionDocument, path: &Path) -> Result<(), SessionError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, doc)?;
    writer.flush()?;
    log_info!("Saved session {} to {}", doc.id, path.display());
    Ok(())
}

pub fn load_session(path: &Path) -> Result<SessionDocument, SessionError> {
    let reader = BufReader::new(File::open(path)?);
    let doc: SessionDocument = serde_json::from_reader(reader)?;
    log_info!("Loaded session {} from {}", doc.id, path.display());
    Ok(doc)
}
