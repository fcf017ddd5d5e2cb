//! Manifest - append-only log of version edits.
//!
//! Every change to the file set is appended here; on startup the manifest
//! is replayed to reconstruct the current version. Records are framed as
//! `[crc32][len][payload]` with little-endian headers; edits are small, so
//! no block fragmentation is needed.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::options::SyncMode;
use crate::util::crc::crc32;
use crate::{Error, Result};

use super::edit::VersionEdit;

/// Record header: CRC (4) + payload length (4).
const HEADER_SIZE: usize = 8;

/// Upper bound on a single record, to reject garbage lengths on read.
const MAX_RECORD_SIZE: usize = 16 * 1024 * 1024;

/// Manifest file writer.
pub struct ManifestWriter {
    writer: BufWriter<File>,
    sync_mode: SyncMode,
    bytes_since_sync: usize,
    file_number: u64,
    path: PathBuf,
}

impl ManifestWriter {
    /// Create a new manifest file, truncating any existing one.
    pub fn new(path: &Path, file_number: u64, sync_mode: SyncMode) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            sync_mode,
            bytes_since_sync: 0,
            file_number,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing manifest for appending.
    pub fn open_for_append(path: &Path, file_number: u64, sync_mode: SyncMode) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            sync_mode,
            bytes_since_sync: 0,
            file_number,
            path: path.to_path_buf(),
        })
    }

    /// Get the file number.
    pub fn file_number(&self) -> u64 {
        self.file_number
    }

    /// Get the manifest file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a version edit.
    pub fn add_edit(&mut self, edit: &VersionEdit) -> Result<()> {
        let payload = edit.encode();

        let mut header = [0u8; HEADER_SIZE];
        header[0..4].copy_from_slice(&crc32(&payload).to_le_bytes());
        header[4..8].copy_from_slice(&(payload.len() as u32).to_le_bytes());

        self.writer.write_all(&header)?;
        self.writer.write_all(&payload)?;
        self.bytes_since_sync += HEADER_SIZE + payload.len();

        self.maybe_sync()
    }

    fn maybe_sync(&mut self) -> Result<()> {
        match self.sync_mode {
            SyncMode::Always => self.sync(),
            SyncMode::Bytes { bytes } => {
                if self.bytes_since_sync >= bytes {
                    self.sync()
                } else {
                    Ok(())
                }
            }
            SyncMode::None => Ok(()),
        }
    }

    /// Force a sync to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.bytes_since_sync = 0;
        Ok(())
    }

    /// Flush and sync, consuming the writer.
    pub fn close(mut self) -> Result<()> {
        self.sync()
    }
}

/// Manifest file reader.
pub struct ManifestReader {
    reader: BufReader<File>,
    file_number: u64,
}

impl ManifestReader {
    /// Open a manifest for replay.
    pub fn new(path: &Path, file_number: u64) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            file_number,
        })
    }

    /// Get the file number.
    pub fn file_number(&self) -> u64 {
        self.file_number
    }

    /// Read the next edit, or `None` at end of file.
    ///
    /// A torn trailing record (partial header or payload) ends the replay;
    /// a corrupt CRC mid-file is an error.
    pub fn read_edit(&mut self) -> Result<Option<VersionEdit>> {
        let mut header = [0u8; HEADER_SIZE];
        match read_exact_or_eof(&mut self.reader, &mut header)? {
            ReadOutcome::Eof => return Ok(None),
            ReadOutcome::Partial => return Ok(None),
            ReadOutcome::Full => {}
        }

        let expected_crc = u32::from_le_bytes(header[0..4].try_into().unwrap());
        let len = u32::from_le_bytes(header[4..8].try_into().unwrap()) as usize;
        if len > MAX_RECORD_SIZE {
            return Err(Error::corruption("manifest record length out of range"));
        }

        let mut payload = vec![0u8; len];
        match read_exact_or_eof(&mut self.reader, &mut payload)? {
            ReadOutcome::Full => {}
            ReadOutcome::Eof | ReadOutcome::Partial => return Ok(None),
        }

        let actual_crc = crc32(&payload);
        if actual_crc != expected_crc {
            return Err(Error::CrcMismatch {
                expected: expected_crc,
                actual: actual_crc,
            });
        }

        VersionEdit::decode(&payload).map(Some)
    }

    /// Read all remaining edits.
    pub fn read_all_edits(&mut self) -> Result<Vec<VersionEdit>> {
        let mut edits = Vec::new();
        while let Some(edit) = self.read_edit()? {
            edits.push(edit);
        }
        Ok(edits)
    }
}

enum ReadOutcome {
    Full,
    Partial,
    Eof,
}

fn read_exact_or_eof(reader: &mut impl Read, buf: &mut [u8]) -> Result<ReadOutcome> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            return Ok(if filled == 0 {
                ReadOutcome::Eof
            } else {
                ReadOutcome::Partial
            });
        }
        filled += n;
    }
    Ok(ReadOutcome::Full)
}

/// Manifest file manager: creation, appending, recovery.
pub struct Manifest {
    writer: ManifestWriter,
    manifest_number: u64,
}

impl Manifest {
    /// Create a new manifest in `db_path`.
    pub fn create(db_path: &Path, manifest_number: u64, sync_mode: SyncMode) -> Result<Self> {
        let path = manifest_file_path(db_path, manifest_number);
        let writer = ManifestWriter::new(&path, manifest_number, sync_mode)?;
        Ok(Self {
            writer,
            manifest_number,
        })
    }

    /// Open an existing manifest for appending.
    pub fn open(db_path: &Path, manifest_number: u64, sync_mode: SyncMode) -> Result<Self> {
        let path = manifest_file_path(db_path, manifest_number);
        let writer = ManifestWriter::open_for_append(&path, manifest_number, sync_mode)?;
        Ok(Self {
            writer,
            manifest_number,
        })
    }

    /// Get the current manifest number.
    pub fn manifest_number(&self) -> u64 {
        self.manifest_number
    }

    /// Append a version edit.
    pub fn log_edit(&mut self, edit: &VersionEdit) -> Result<()> {
        self.writer.add_edit(edit)
    }

    /// Sync the manifest to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.writer.sync()
    }

    /// Replay all edits from a manifest file.
    pub fn recover(db_path: &Path, manifest_number: u64) -> Result<Vec<VersionEdit>> {
        let path = manifest_file_path(db_path, manifest_number);
        let mut reader = ManifestReader::new(&path, manifest_number)?;
        reader.read_all_edits()
    }

    /// Close the manifest.
    pub fn close(self) -> Result<()> {
        self.writer.close()
    }
}

/// Generate a manifest file path.
pub fn manifest_file_path(db_path: &Path, manifest_number: u64) -> PathBuf {
    db_path.join(format!("MANIFEST-{:06}", manifest_number))
}

/// Parse a manifest file name to extract its number.
pub fn parse_manifest_filename(filename: &str) -> Option<u64> {
    filename.strip_prefix("MANIFEST-")?.parse().ok()
}

/// Atomically point the CURRENT file at the given manifest.
pub fn set_current_file(db_path: &Path, manifest_number: u64) -> Result<()> {
    let manifest_name = format!("MANIFEST-{:06}", manifest_number);
    let current_path = db_path.join("CURRENT");
    let temp_path = db_path.join("CURRENT.dbtmp");

    {
        let mut file = File::create(&temp_path)?;
        writeln!(file, "{}", manifest_name)?;
        file.sync_all()?;
    }

    std::fs::rename(&temp_path, &current_path)?;
    Ok(())
}

/// Read the active manifest name from CURRENT, if the database exists.
pub fn read_current_manifest(db_path: &Path) -> Result<Option<String>> {
    let current_path = db_path.join("CURRENT");
    if !current_path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&current_path)?;
    Ok(Some(content.trim().to_string()))
}
