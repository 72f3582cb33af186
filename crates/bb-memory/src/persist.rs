//! JSON record files.
//!
//! Both the node list and the action roster are stored as a pretty-printed
//! JSON array of flat records. Writes go through a temporary file in the
//! target directory and are renamed into place, so a crash mid-save leaves
//! the previous file intact.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;

use crate::error::{StoreError, StoreResult};

/// One entry of the persisted node list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub word: String,
}

/// Read an array of records. A missing file reads as an empty array.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> StoreResult<Vec<T>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&text)
        .map_err(|e| StoreError::Serialization(format!("{}: {e}", path.display())))
}

/// Write an array of records, creating parent directories as needed.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> StoreResult<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    records
        .serialize(&mut ser)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    buf.push(b'\n');

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&buf)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<NodeRecord> = read_records(&dir.path().join("nope.data")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory/data/nodes.data");
        let records = vec![
            NodeRecord { word: "GAZP".into() },
            NodeRecord { word: "M1".into() },
        ];
        write_records(&path, &records).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("    {"));
        assert!(text.contains(r#""word": "GAZP""#));

        let back: Vec<NodeRecord> = read_records(&path).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.data");
        fs::write(&path, "{ not json").unwrap();
        let err = read_records::<NodeRecord>(&path).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
