//! Pick the newest uploaded file for each import role.

use crate::error::{CallGraphError, Result};
use crate::types::FileRole;

/// One uploaded file with its client-supplied timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub timestamp: i64,
    pub contents: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, timestamp: i64, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            timestamp,
            contents: contents.into(),
        }
    }
}

/// The file chosen for each role.
#[derive(Debug, Clone, Copy)]
pub struct SelectedFiles<'a> {
    pub methods: &'a UploadedFile,
    pub invokes: &'a UploadedFile,
    pub targets: &'a UploadedFile,
}

impl<'a> SelectedFiles<'a> {
    pub fn get(&self, role: FileRole) -> &'a UploadedFile {
        match role {
            FileRole::Methods => self.methods,
            FileRole::Invokes => self.invokes,
            FileRole::Targets => self.targets,
        }
    }
}

/// Pair uploaded `(file name, contents)` parts with their timestamps,
/// positionally. The two lists must have the same length.
pub fn attach_timestamps(
    files: Vec<(String, Vec<u8>)>,
    timestamps: &[i64],
) -> Result<Vec<UploadedFile>> {
    if files.len() != timestamps.len() {
        return Err(CallGraphError::InvalidInput(format!(
            "Received {} files but {} timestamps",
            files.len(),
            timestamps.len()
        )));
    }
    Ok(files
        .into_iter()
        .zip(timestamps)
        .map(|((name, contents), &ts)| UploadedFile::new(name, ts, contents))
        .collect())
}

/// Newest file whose name carries `role`. Ties keep the earliest upload.
fn newest_for(files: &[UploadedFile], role: FileRole) -> Option<&UploadedFile> {
    files
        .iter()
        .filter(|f| role.matches(&f.file_name))
        .fold(None, |best: Option<&UploadedFile>, f| match best {
            Some(b) if b.timestamp >= f.timestamp => Some(b),
            _ => Some(f),
        })
}

/// Select the newest `methods`, `invokes` and `targets` CSV files.
///
/// Files that match no role (or are not `.csv`) are ignored. Fails with
/// `"Could not find a {role} file"` for the first role without a candidate.
pub fn select_newest(files: &[UploadedFile]) -> Result<SelectedFiles<'_>> {
    let pick = |role: FileRole| {
        newest_for(files, role)
            .ok_or_else(|| CallGraphError::InvalidInput(format!("Could not find a {role} file")))
    };

    Ok(SelectedFiles {
        methods: pick(FileRole::Methods)?,
        invokes: pick(FileRole::Invokes)?,
        targets: pick(FileRole::Targets)?,
    })
}
