//! Database file naming conventions.
//!
//! Every file the engine writes is classifiable from its name alone; the
//! obsolete-file resolver depends on that to decide keep versus delete.

use std::path::{Path, PathBuf};

use crate::options::DbPath;

/// Prefix shared by options files and their temp incarnations.
pub const OPTIONS_FILE_PREFIX: &str = "OPTIONS-";

/// File types in the database directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Write-ahead log file.
    Log,
    /// Lock file to prevent concurrent access.
    DbLock,
    /// SSTable data file.
    Table,
    /// Manifest (descriptor) file holding version-edit history.
    Descriptor,
    /// CURRENT file (points to the active manifest).
    Current,
    /// Temporary file.
    Temp,
    /// Info log file.
    InfoLog,
    /// Database identity file.
    Identity,
    /// Descriptor of a meta database.
    MetaDatabase,
    /// Persisted options file.
    OptionsFile,
    /// Blob data file.
    Blob,
}

/// Generate the lock file path.
pub fn lock_file_path(db_path: &Path) -> PathBuf {
    db_path.join("LOCK")
}

/// Generate the current file path.
pub fn current_file_path(db_path: &Path) -> PathBuf {
    db_path.join("CURRENT")
}

/// Generate the identity file path.
pub fn identity_file_path(db_path: &Path) -> PathBuf {
    db_path.join("IDENTITY")
}

/// The file name of a manifest with the given number.
pub fn descriptor_file_name(number: u64) -> String {
    format!("MANIFEST-{:06}", number)
}

/// Generate a manifest file path.
pub fn descriptor_file_path(db_path: &Path, number: u64) -> PathBuf {
    db_path.join(descriptor_file_name(number))
}

/// Generate a log (WAL) file path.
pub fn log_file_path(wal_dir: &Path, number: u64) -> PathBuf {
    wal_dir.join(format!("{:06}.log", number))
}

/// The bare file name of a table file.
pub fn table_file_name(number: u64) -> String {
    format!("{:06}.sst", number)
}

/// Generate an SSTable file path within the configured directory set.
///
/// `path_id` indexes into `db_paths`; out-of-range ids fall back to the
/// primary directory.
pub fn table_file_path(db_paths: &[DbPath], number: u64, path_id: u32) -> PathBuf {
    let dir = db_paths
        .get(path_id as usize)
        .unwrap_or(&db_paths[0]);
    dir.path.join(table_file_name(number))
}

/// Generate a temporary file path.
pub fn temp_file_path(db_path: &Path, number: u64) -> PathBuf {
    db_path.join(format!("{:06}.dbtmp", number))
}

/// The info log prefix for parsing.
///
/// When info logs live in a separate `db_log_dir` they carry the flattened
/// database path as a prefix so several databases can share the directory.
pub fn info_log_prefix(has_log_dir: bool, db_path: &Path) -> String {
    if has_log_dir {
        let mut flattened: String = db_path
            .to_string_lossy()
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        flattened.push_str("_LOG");
        flattened
    } else {
        "LOG".to_string()
    }
}

/// Generate the current info log file path.
pub fn info_log_path(log_dir: &Path, prefix: &str) -> PathBuf {
    log_dir.join(prefix)
}

/// Parse a file name and return its type and number.
///
/// Accepts an optional leading `/` (candidate lists are slash-normalised).
/// Returns `None` if the file name doesn't match any known pattern.
pub fn parse_file_name(name: &str, info_log_prefix: &str) -> Option<(FileType, u64)> {
    let name = name.strip_prefix('/').unwrap_or(name);

    // Fixed-name files first.
    if name == "CURRENT" {
        return Some((FileType::Current, 0));
    }
    if name == "LOCK" {
        return Some((FileType::DbLock, 0));
    }
    if name == "IDENTITY" {
        return Some((FileType::Identity, 0));
    }

    if let Some(suffix) = name.strip_prefix("MANIFEST-") {
        if let Ok(number) = suffix.parse::<u64>() {
            return Some((FileType::Descriptor, number));
        }
        return None;
    }

    if let Some(suffix) = name.strip_prefix("METADB-") {
        if let Ok(number) = suffix.parse::<u64>() {
            return Some((FileType::MetaDatabase, number));
        }
        return None;
    }

    if let Some(suffix) = name.strip_prefix(OPTIONS_FILE_PREFIX) {
        if let Some(num_str) = suffix.strip_suffix(".dbtmp") {
            if let Ok(number) = num_str.parse::<u64>() {
                return Some((FileType::Temp, number));
            }
        } else if let Ok(number) = suffix.parse::<u64>() {
            return Some((FileType::OptionsFile, number));
        }
        return None;
    }

    // Info logs: "<prefix>", "<prefix>.old", "<prefix>.old.<number>".
    if let Some(suffix) = name.strip_prefix(info_log_prefix) {
        if suffix.is_empty() {
            return Some((FileType::InfoLog, 0));
        }
        if suffix == ".old" {
            return Some((FileType::InfoLog, 0));
        }
        if let Some(num_str) = suffix.strip_prefix(".old.") {
            if let Ok(number) = num_str.parse::<u64>() {
                return Some((FileType::InfoLog, number));
            }
        }
        return None;
    }

    // Numbered files: NNNNNN.ext
    let dot_pos = name.rfind('.')?;
    let (num_str, ext) = name.split_at(dot_pos);
    let number = num_str.parse::<u64>().ok()?;

    let file_type = match &ext[1..] {
        "log" => FileType::Log,
        "sst" => FileType::Table,
        "blob" => FileType::Blob,
        "dbtmp" => FileType::Temp,
        _ => return None,
    };

    Some((file_type, number))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str) -> Option<(FileType, u64)> {
        parse_file_name(name, "LOG")
    }

    #[test]
    fn test_file_paths() {
        let db_path = Path::new("/data/db");
        let paths = vec![DbPath::new("/data/db", 0), DbPath::new("/fast", 0)];

        assert_eq!(lock_file_path(db_path), Path::new("/data/db/LOCK"));
        assert_eq!(current_file_path(db_path), Path::new("/data/db/CURRENT"));
        assert_eq!(
            descriptor_file_path(db_path, 5),
            Path::new("/data/db/MANIFEST-000005")
        );
        assert_eq!(
            log_file_path(db_path, 123),
            Path::new("/data/db/000123.log")
        );
        assert_eq!(
            table_file_path(&paths, 456, 0),
            Path::new("/data/db/000456.sst")
        );
        assert_eq!(
            table_file_path(&paths, 456, 1),
            Path::new("/fast/000456.sst")
        );
        // Out-of-range path id falls back to primary.
        assert_eq!(
            table_file_path(&paths, 456, 9),
            Path::new("/data/db/000456.sst")
        );
        assert_eq!(
            temp_file_path(db_path, 789),
            Path::new("/data/db/000789.dbtmp")
        );
    }

    #[test]
    fn test_parse_fixed_names() {
        assert_eq!(parse("CURRENT"), Some((FileType::Current, 0)));
        assert_eq!(parse("LOCK"), Some((FileType::DbLock, 0)));
        assert_eq!(parse("IDENTITY"), Some((FileType::Identity, 0)));
        assert_eq!(parse("LOG"), Some((FileType::InfoLog, 0)));
        assert_eq!(parse("LOG.old"), Some((FileType::InfoLog, 0)));
        assert_eq!(parse("LOG.old.123"), Some((FileType::InfoLog, 123)));
    }

    #[test]
    fn test_parse_numbered_names() {
        assert_eq!(parse("000123.log"), Some((FileType::Log, 123)));
        assert_eq!(parse("000456.sst"), Some((FileType::Table, 456)));
        assert_eq!(parse("000789.dbtmp"), Some((FileType::Temp, 789)));
        assert_eq!(parse("000007.blob"), Some((FileType::Blob, 7)));
        assert_eq!(parse("MANIFEST-000005"), Some((FileType::Descriptor, 5)));
        assert_eq!(parse("METADB-000002"), Some((FileType::MetaDatabase, 2)));
        assert_eq!(parse("OPTIONS-000033"), Some((FileType::OptionsFile, 33)));
        assert_eq!(parse("OPTIONS-000033.dbtmp"), Some((FileType::Temp, 33)));
    }

    #[test]
    fn test_parse_slash_normalised() {
        assert_eq!(parse("/000123.log"), Some((FileType::Log, 123)));
        assert_eq!(parse("/CURRENT"), Some((FileType::Current, 0)));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(parse("random.txt"), None);
        assert_eq!(parse("abc.log"), None);
        assert_eq!(parse("MANIFEST-"), None);
        assert_eq!(parse("LOG.older"), None);
    }

    #[test]
    fn test_info_log_prefix() {
        assert_eq!(info_log_prefix(false, Path::new("/data/db")), "LOG");
        assert_eq!(
            info_log_prefix(true, Path::new("/data/db")),
            "_data_db_LOG"
        );
    }
}
