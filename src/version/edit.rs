//! VersionEdit - describes changes between versions.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashSet;

use crate::types::InternalKey;
use crate::{Error, Result};

use super::EditTag;

/// Parameters of a file introduced by an edit. The builder turns this into
/// the shared [`FileMetadata`](super::FileMetadata) record.
#[derive(Debug, Clone)]
pub struct NewFileEntry {
    /// Unique file number.
    pub file_number: u64,
    /// Storage directory index.
    pub path_id: u32,
    /// File size in bytes.
    pub file_size: u64,
    /// Smallest internal key.
    pub smallest: InternalKey,
    /// Largest internal key.
    pub largest: InternalKey,
    /// Smallest sequence number.
    pub smallest_seqno: u64,
    /// Largest sequence number.
    pub largest_seqno: u64,
}

/// A slice introduced by an edit, not yet bound to its parent record.
///
/// The parent is referenced by file number; the builder resolves it against
/// the base snapshot and staged state when the edit is materialised.
#[derive(Debug, Clone)]
pub struct FileSliceRecord {
    /// File number the slice is logically assigned into at its level.
    pub output_file_number: u64,
    /// File number of the parent the slice reads from.
    pub parent_file_number: u64,
    /// Smallest key of the slice.
    pub smallest: InternalKey,
    /// Largest key of the slice (inclusive).
    pub largest: InternalKey,
    /// Whether the smallest boundary is inclusive.
    pub is_contain_smallest: bool,
}

/// A VersionEdit describes the changes between two consecutive versions.
///
/// It records files added and deleted per level, files moved into the
/// frozen set, new file slices, and updated log/manifest numbers.
#[derive(Debug, Clone, Default)]
pub struct VersionEdit {
    /// Comparator name (set on the first edit).
    pub comparator: Option<String>,
    /// Minimum WAL number still holding unflushed data.
    pub log_number: Option<u64>,
    /// Previous log number (kept for recovery compatibility).
    pub prev_log_number: Option<u64>,
    /// Next file number to allocate.
    pub next_file_number: Option<u64>,
    /// Last sequence number used.
    pub last_sequence: Option<u64>,
    /// Manifest number in effect when the edit was produced.
    pub manifest_number: Option<u64>,
    /// Files to delete: (level, file_number).
    pub deleted_files: HashSet<(usize, u64)>,
    /// New files to add: (level, entry).
    pub new_files: Vec<(usize, NewFileEntry)>,
    /// Files moved to the frozen set: (level, file_number).
    pub frozen_files: Vec<(usize, u64)>,
    /// New file slices: (level, record).
    pub new_file_slices: Vec<(usize, FileSliceRecord)>,
}

impl VersionEdit {
    /// Create a new empty edit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the comparator name.
    pub fn set_comparator(&mut self, name: impl Into<String>) {
        self.comparator = Some(name.into());
    }

    /// Set the log number.
    pub fn set_log_number(&mut self, num: u64) {
        self.log_number = Some(num);
    }

    /// Set the previous log number.
    pub fn set_prev_log_number(&mut self, num: u64) {
        self.prev_log_number = Some(num);
    }

    /// Set the next file number.
    pub fn set_next_file_number(&mut self, num: u64) {
        self.next_file_number = Some(num);
    }

    /// Set the last sequence number.
    pub fn set_last_sequence(&mut self, seq: u64) {
        self.last_sequence = Some(seq);
    }

    /// Set the manifest number.
    pub fn set_manifest_number(&mut self, num: u64) {
        self.manifest_number = Some(num);
    }

    /// Record a file deletion.
    pub fn delete_file(&mut self, level: usize, file_number: u64) {
        self.deleted_files.insert((level, file_number));
    }

    /// Record a new file.
    pub fn add_file(&mut self, level: usize, entry: NewFileEntry) {
        self.new_files.push((level, entry));
    }

    /// Record a move of an existing file into the frozen set.
    pub fn move_to_frozen(&mut self, level: usize, file_number: u64) {
        self.frozen_files.push((level, file_number));
    }

    /// Record a new file slice.
    pub fn add_file_slice(&mut self, level: usize, record: FileSliceRecord) {
        self.new_file_slices.push((level, record));
    }

    /// Check if the edit is empty.
    pub fn is_empty(&self) -> bool {
        self.comparator.is_none()
            && self.log_number.is_none()
            && self.prev_log_number.is_none()
            && self.next_file_number.is_none()
            && self.last_sequence.is_none()
            && self.manifest_number.is_none()
            && self.deleted_files.is_empty()
            && self.new_files.is_empty()
            && self.frozen_files.is_empty()
            && self.new_file_slices.is_empty()
    }

    /// Encode the edit to bytes.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(256);

        if let Some(ref name) = self.comparator {
            buf.put_u8(EditTag::Comparator.to_byte());
            encode_length_prefixed(&mut buf, name.as_bytes());
        }

        if let Some(num) = self.log_number {
            buf.put_u8(EditTag::LogNumber.to_byte());
            encode_varint(&mut buf, num);
        }

        if let Some(num) = self.prev_log_number {
            buf.put_u8(EditTag::PrevLogNumber.to_byte());
            encode_varint(&mut buf, num);
        }

        if let Some(num) = self.next_file_number {
            buf.put_u8(EditTag::NextFileNumber.to_byte());
            encode_varint(&mut buf, num);
        }

        if let Some(seq) = self.last_sequence {
            buf.put_u8(EditTag::LastSequence.to_byte());
            encode_varint(&mut buf, seq);
        }

        if let Some(num) = self.manifest_number {
            buf.put_u8(EditTag::ManifestNumber.to_byte());
            encode_varint(&mut buf, num);
        }

        for &(level, file_number) in &self.deleted_files {
            buf.put_u8(EditTag::DeletedFile.to_byte());
            encode_varint(&mut buf, level as u64);
            encode_varint(&mut buf, file_number);
        }

        for (level, entry) in &self.new_files {
            buf.put_u8(EditTag::NewFile.to_byte());
            encode_varint(&mut buf, *level as u64);
            encode_varint(&mut buf, entry.file_number);
            encode_varint(&mut buf, entry.path_id as u64);
            encode_varint(&mut buf, entry.file_size);
            encode_varint(&mut buf, entry.smallest_seqno);
            encode_varint(&mut buf, entry.largest_seqno);
            encode_length_prefixed(&mut buf, &entry.smallest.encode());
            encode_length_prefixed(&mut buf, &entry.largest.encode());
        }

        for &(level, file_number) in &self.frozen_files {
            buf.put_u8(EditTag::FrozenFile.to_byte());
            encode_varint(&mut buf, level as u64);
            encode_varint(&mut buf, file_number);
        }

        for (level, record) in &self.new_file_slices {
            buf.put_u8(EditTag::FileSlice.to_byte());
            encode_varint(&mut buf, *level as u64);
            encode_varint(&mut buf, record.output_file_number);
            encode_varint(&mut buf, record.parent_file_number);
            buf.put_u8(record.is_contain_smallest as u8);
            encode_length_prefixed(&mut buf, &record.smallest.encode());
            encode_length_prefixed(&mut buf, &record.largest.encode());
        }

        buf.freeze()
    }

    /// Decode an edit from bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut edit = VersionEdit::new();
        let mut cursor = data;

        while !cursor.is_empty() {
            let tag = cursor.get_u8();
            let tag = EditTag::from_byte(tag)
                .ok_or_else(|| Error::corruption(format!("unknown edit tag: {}", tag)))?;

            match tag {
                EditTag::Comparator => {
                    let name = decode_length_prefixed(&mut cursor)?;
                    edit.comparator = Some(
                        String::from_utf8(name.to_vec())
                            .map_err(|_| Error::corruption("invalid comparator name"))?,
                    );
                }
                EditTag::LogNumber => {
                    edit.log_number = Some(decode_varint(&mut cursor)?);
                }
                EditTag::PrevLogNumber => {
                    edit.prev_log_number = Some(decode_varint(&mut cursor)?);
                }
                EditTag::NextFileNumber => {
                    edit.next_file_number = Some(decode_varint(&mut cursor)?);
                }
                EditTag::LastSequence => {
                    edit.last_sequence = Some(decode_varint(&mut cursor)?);
                }
                EditTag::ManifestNumber => {
                    edit.manifest_number = Some(decode_varint(&mut cursor)?);
                }
                EditTag::DeletedFile => {
                    let level = decode_varint(&mut cursor)? as usize;
                    let file_number = decode_varint(&mut cursor)?;
                    edit.deleted_files.insert((level, file_number));
                }
                EditTag::NewFile => {
                    let level = decode_varint(&mut cursor)? as usize;
                    let file_number = decode_varint(&mut cursor)?;
                    let path_id = decode_varint(&mut cursor)? as u32;
                    let file_size = decode_varint(&mut cursor)?;
                    let smallest_seqno = decode_varint(&mut cursor)?;
                    let largest_seqno = decode_varint(&mut cursor)?;
                    let smallest = decode_internal_key(&mut cursor)?;
                    let largest = decode_internal_key(&mut cursor)?;

                    edit.new_files.push((
                        level,
                        NewFileEntry {
                            file_number,
                            path_id,
                            file_size,
                            smallest,
                            largest,
                            smallest_seqno,
                            largest_seqno,
                        },
                    ));
                }
                EditTag::FrozenFile => {
                    let level = decode_varint(&mut cursor)? as usize;
                    let file_number = decode_varint(&mut cursor)?;
                    edit.frozen_files.push((level, file_number));
                }
                EditTag::FileSlice => {
                    let level = decode_varint(&mut cursor)? as usize;
                    let output_file_number = decode_varint(&mut cursor)?;
                    let parent_file_number = decode_varint(&mut cursor)?;
                    if cursor.is_empty() {
                        return Err(Error::corruption("truncated file slice"));
                    }
                    let is_contain_smallest = cursor.get_u8() != 0;
                    let smallest = decode_internal_key(&mut cursor)?;
                    let largest = decode_internal_key(&mut cursor)?;

                    edit.new_file_slices.push((
                        level,
                        FileSliceRecord {
                            output_file_number,
                            parent_file_number,
                            smallest,
                            largest,
                            is_contain_smallest,
                        },
                    ));
                }
            }
        }

        Ok(edit)
    }
}

fn decode_internal_key(cursor: &mut &[u8]) -> Result<InternalKey> {
    let bytes = decode_length_prefixed(cursor)?;
    InternalKey::decode(bytes).ok_or_else(|| Error::corruption("invalid internal key"))
}

/// Encode a varint.
fn encode_varint(buf: &mut BytesMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Decode a varint.
fn decode_varint(cursor: &mut &[u8]) -> Result<u64> {
    let mut result = 0u64;
    let mut shift = 0;

    loop {
        if cursor.is_empty() {
            return Err(Error::corruption("truncated varint"));
        }

        let byte = cursor.get_u8();
        result |= ((byte & 0x7F) as u64) << shift;

        if byte & 0x80 == 0 {
            return Ok(result);
        }

        shift += 7;
        if shift >= 64 {
            return Err(Error::corruption("varint overflow"));
        }
    }
}

/// Encode length-prefixed bytes.
fn encode_length_prefixed(buf: &mut BytesMut, data: &[u8]) {
    encode_varint(buf, data.len() as u64);
    buf.put_slice(data);
}

/// Decode length-prefixed bytes.
fn decode_length_prefixed<'a>(cursor: &mut &'a [u8]) -> Result<&'a [u8]> {
    let len = decode_varint(cursor)? as usize;
    if cursor.len() < len {
        return Err(Error::corruption("truncated length-prefixed data"));
    }
    let data = &cursor[..len];
    *cursor = &cursor[len..];
    Ok(data)
}
