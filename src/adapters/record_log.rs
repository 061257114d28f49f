//! File-backed record store.
//!
//! Implements [`StoragePort`] as an append-only log plus a content-addressed
//! photo archive:
//!
//! ```text
//!   <data_dir>/records.log            [len: u32 LE][postcard Record] ...
//!   <data_dir>/photos/<digest>.rgbz   [width: u32 LE][height: u32 LE][DEFLATE rgb]
//! ```
//!
//! Every append is one `write_all` of a complete frame followed by a flush.
//! A crash mid-write leaves at most one torn frame at the tail, which
//! [`decode_frames`] skips.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use log::{info, warn};
use miniz_oxide::deflate::compress_to_vec;
use miniz_oxide::inflate::decompress_to_vec;

use crate::app::ports::{Record, RecordKind, StorageError, StoragePort};
use crate::vision::photo::{Photo, PhotoRef};

const LOG_FILE: &str = "records.log";
const PHOTO_DIR: &str = "photos";
const PHOTO_EXT: &str = "rgbz";

/// DEFLATE level for archived photos (1-10).
const COMPRESSION_LEVEL: u8 = 6;

/// Frames larger than this are treated as corruption.
pub const MAX_FRAME_LEN: usize = 1 << 20;

pub struct FileRecordStore {
    root: PathBuf,
    log: Mutex<File>,
}

impl FileRecordStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(PHOTO_DIR)).map_err(io_error)?;
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(root.join(LOG_FILE))
            .map_err(io_error)?;
        info!("FileRecordStore: opened {}", root.display());
        Ok(Self {
            root,
            log: Mutex::new(log),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read an archived photo back.
    pub fn load_photo(&self, reference: &PhotoRef) -> Result<Photo, StorageError> {
        let bytes = match fs::read(self.photo_path(reference)) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StorageError::NotFound),
            Err(e) => return Err(io_error(e)),
        };
        decode_photo(&bytes)
    }

    fn photo_path(&self, reference: &PhotoRef) -> PathBuf {
        self.root
            .join(PHOTO_DIR)
            .join(format!("{}.{PHOTO_EXT}", reference.as_str()))
    }

    fn read_log(&self) -> Result<Vec<u8>, StorageError> {
        let mut bytes = Vec::new();
        File::open(self.root.join(LOG_FILE))
            .and_then(|mut f| f.read_to_end(&mut bytes))
            .map_err(io_error)?;
        Ok(bytes)
    }
}

impl StoragePort for FileRecordStore {
    fn append(&self, record: &Record) -> Result<(), StorageError> {
        let frame = encode_frame(record)?;
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.write_all(&frame).map_err(io_error)?;
        log.flush().map_err(io_error)
    }

    fn recent(&self, kind: RecordKind, limit: usize) -> Result<Vec<Record>, StorageError> {
        // Hold the append lock so the scan never sees a half-written frame.
        let _guard = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        let bytes = self.read_log()?;
        let mut matching: Vec<Record> = decode_frames(&bytes)
            .into_iter()
            .filter(|r| r.kind() == kind)
            .collect();
        matching.reverse();
        matching.truncate(limit);
        Ok(matching)
    }

    fn store_photo(&self, photo: &Photo) -> Result<PhotoRef, StorageError> {
        let reference = photo.digest();
        let path = self.photo_path(&reference);
        if path.exists() {
            return Ok(reference);
        }

        let mut blob = Vec::with_capacity(8 + photo.rgb.len() / 4);
        blob.extend_from_slice(&photo.width.to_le_bytes());
        blob.extend_from_slice(&photo.height.to_le_bytes());
        blob.extend_from_slice(&compress_to_vec(&photo.rgb, COMPRESSION_LEVEL));

        // Write-then-rename so a reader never sees a partial photo.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &blob).map_err(io_error)?;
        fs::rename(&tmp, &path).map_err(io_error)?;
        Ok(reference)
    }
}

// ── Frame codec ───────────────────────────────────────────────

/// Encode one record as a length-prefixed frame.
pub fn encode_frame(record: &Record) -> Result<Vec<u8>, StorageError> {
    let payload = postcard::to_allocvec(record).map_err(|_| StorageError::Corrupted)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(StorageError::Full);
    }
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode every complete frame.  Stops at the first torn or oversized
/// frame; a frame whose payload does not decode is skipped.
pub fn decode_frames(mut bytes: &[u8]) -> Vec<Record> {
    let mut records = Vec::new();
    while bytes.len() >= 4 {
        let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        if len > MAX_FRAME_LEN || bytes.len() - 4 < len {
            warn!("record log: torn frame at tail ({} bytes ignored)", bytes.len());
            break;
        }
        let payload = &bytes[4..4 + len];
        match postcard::from_bytes::<Record>(payload) {
            Ok(record) => records.push(record),
            Err(e) => warn!("record log: undecodable frame skipped: {e}"),
        }
        bytes = &bytes[4 + len..];
    }
    records
}

fn decode_photo(bytes: &[u8]) -> Result<Photo, StorageError> {
    if bytes.len() < 8 {
        return Err(StorageError::Corrupted);
    }
    let width = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let height = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let rgb = decompress_to_vec(&bytes[8..]).map_err(|_| StorageError::Corrupted)?;
    let photo = Photo::new(width, height, rgb);
    photo.validate().map_err(|_| StorageError::Corrupted)?;
    Ok(photo)
}

fn io_error(e: std::io::Error) -> StorageError {
    warn!("FileRecordStore: I/O error: {e}");
    match e.kind() {
        ErrorKind::NotFound => StorageError::NotFound,
        ErrorKind::StorageFull => StorageError::Full,
        _ => StorageError::IoError,
    }
}
