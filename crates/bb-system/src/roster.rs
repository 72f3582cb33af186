use std::path::{Path, PathBuf};

use bb_memory::persist;
use serde::{Deserialize, Serialize};

use crate::error::SystemResult;

/// One persisted roster entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub path: PathBuf,
    pub name: String,
}

/// Read the roster. A missing file is an empty roster.
pub fn load(path: &Path) -> SystemResult<Vec<ActionRecord>> {
    Ok(persist::read_records(path)?)
}

pub fn save(path: &Path, records: &[ActionRecord]) -> SystemResult<()> {
    Ok(persist::write_records(path, records)?)
}
