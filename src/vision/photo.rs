//! Photo model, PPM decoding and content digests.
//!
//! Photos travel through the engine as packed RGB8 frames.  The camera
//! transport decides how bytes arrive; the command camera adapter asks the
//! capture tool for binary PPM (P6), decoded here.

use core::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Reference to an archived photo: hex SHA-256 of its dimensions and pixels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhotoRef(pub heapless::String<64>);

impl PhotoRef {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Packed RGB8 frame, row-major, no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl Photo {
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Self {
        Self { width, height, rgb }
    }

    /// A frame filled with one colour.  Handy for tests and simulators.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut buf = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            buf.extend_from_slice(&rgb);
        }
        Self::new(width, height, buf)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Check that the buffer matches the declared dimensions.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.width == 0 || self.height == 0 {
            return Err(DataError::EmptyPhoto);
        }
        if self.rgb.len() != self.pixel_count() * 3 {
            return Err(DataError::PixelBufferMismatch);
        }
        Ok(())
    }

    /// Iterate `(r, g, b)` triples.
    pub fn pixels(&self) -> impl Iterator<Item = (u8, u8, u8)> + '_ {
        self.rgb.chunks_exact(3).map(|p| (p[0], p[1], p[2]))
    }

    /// Content digest used as the storage reference.
    pub fn digest(&self) -> PhotoRef {
        let mut hasher = hmac_sha256::Hash::new();
        hasher.update(self.width.to_le_bytes());
        hasher.update(self.height.to_le_bytes());
        hasher.update(&self.rgb);
        let hash = hasher.finalize();

        let mut hex = heapless::String::<64>::new();
        for byte in hash {
            let _ = write!(hex, "{byte:02x}");
        }
        PhotoRef(hex)
    }

    /// Decode a binary PPM (P6) image with maxval up to 255.
    pub fn from_ppm(bytes: &[u8]) -> Result<Self, DataError> {
        let mut cursor = PpmCursor { bytes, pos: 0 };

        if cursor.token() != Some(b"P6".as_slice()) {
            return Err(DataError::UndecodablePhoto);
        }
        let width = cursor.number()?;
        let height = cursor.number()?;
        let maxval = cursor.number()?;
        if maxval == 0 || maxval > 255 {
            return Err(DataError::UndecodablePhoto);
        }
        // Exactly one whitespace byte separates the header from the raster.
        if !cursor.bytes.get(cursor.pos).is_some_and(u8::is_ascii_whitespace) {
            return Err(DataError::UndecodablePhoto);
        }
        cursor.pos += 1;

        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(3))
            .ok_or(DataError::UndecodablePhoto)?;
        let raster = &bytes[cursor.pos..];
        if raster.len() < expected {
            return Err(DataError::PixelBufferMismatch);
        }

        let mut rgb = raster[..expected].to_vec();
        if maxval < 255 {
            for sample in &mut rgb {
                *sample = ((u32::from(*sample).min(maxval) * 255) / maxval) as u8;
            }
        }

        let photo = Self::new(width, height, rgb);
        photo.validate()?;
        Ok(photo)
    }

    /// Encode as binary PPM (P6).
    pub fn to_ppm(&self) -> Vec<u8> {
        let mut out = format!("P6\n{} {}\n255\n", self.width, self.height).into_bytes();
        out.extend_from_slice(&self.rgb);
        out
    }
}

// ── PPM header tokenizer ──────────────────────────────────────

struct PpmCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> PpmCursor<'a> {
    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else if b == b'#' {
                while let Some(&c) = self.bytes.get(self.pos) {
                    self.pos += 1;
                    if c == b'\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn token(&mut self) -> Option<&'a [u8]> {
        self.skip_whitespace_and_comments();
        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|b| !b.is_ascii_whitespace() && *b != b'#')
        {
            self.pos += 1;
        }
        (self.pos > start).then(|| &self.bytes[start..self.pos])
    }

    fn number(&mut self) -> Result<u32, DataError> {
        let token = self.token().ok_or(DataError::UndecodablePhoto)?;
        core::str::from_utf8(token)
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or(DataError::UndecodablePhoto)
    }
}
