use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use im::HashMap;
use walkdir::WalkDir;

use crate::{
    error::{ExportError, Result},
    io::{to_cell, ReportWorkbook},
};

const REFERENCE_SHEET: &str = "TDSheet";
const CODE_COLUMN: u32 = 1;
const NAME_COLUMN: u32 = 3;

/// Object code to object name mapping. Loaded once per run and never modified.
#[derive(Debug, Clone, Default)]
pub struct ReferenceBook(HashMap<String, String>);

impl ReferenceBook {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self(pairs.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// An unknown code is fatal: there is no sensible fund for an unknown object.
    pub fn object_name(&self, code: &str, sheet: &str) -> Result<&str> {
        self.0
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| ExportError::UnknownObjectCode {
                code: code.to_string(),
                sheet: sheet.to_string(),
            })
    }
}

pub fn is_reference_file(file_name: &str) -> bool {
    file_name.starts_with("НСИ") && file_name.to_lowercase().contains("общий")
}

fn created_or_modified(entry: &walkdir::DirEntry) -> SystemTime {
    entry
        .metadata()
        .ok()
        .and_then(|m| m.created().or_else(|_| m.modified()).ok())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Latest timestamp wins. Equal timestamps fall back to the greater path so the pick does not
/// depend on directory listing order.
fn newest<I>(candidates: I) -> Option<PathBuf>
where
    I: Iterator<Item = (SystemTime, PathBuf)>,
{
    candidates
        .max_by(|(a_time, a_path), (b_time, b_path)| {
            a_time.cmp(b_time).then_with(|| a_path.cmp(b_path))
        })
        .map(|(_, path)| path)
}

/// The newest reference workbook directly inside `directory`.
pub fn find_reference_file(directory: &Path) -> Result<PathBuf> {
    if !directory.is_dir() {
        return Err(ExportError::ReferenceNotFound(directory.to_path_buf()));
    }
    let candidates = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_str().map_or(false, is_reference_file))
        .map(|e| (created_or_modified(&e), e.into_path()));

    newest(candidates).ok_or_else(|| ExportError::ReferenceNotFound(directory.to_path_buf()))
}

pub fn load_reference(path: &Path) -> Result<ReferenceBook> {
    let range = ReportWorkbook::open(path)?.range(REFERENCE_SHEET)?;
    let mut pairs = Vec::new();
    if let (Some(start), Some(end)) = (range.start(), range.end()) {
        // row 0 holds the column titles
        for row in start.0.max(1)..=end.0 {
            let code = range.get_value((row, CODE_COLUMN)).map(to_cell);
            let name = range.get_value((row, NAME_COLUMN)).map(to_cell);
            match (code, name) {
                (Some(code), Some(name)) if !code.is_empty() => {
                    pairs.push((code.to_string(), name.to_string()))
                }
                _ => tracing::warn!("reference row {} has no object code, skipped", row),
            }
        }
    }
    tracing::info!("loaded {} object codes from {}", pairs.len(), path.display());
    Ok(ReferenceBook::from_pairs(pairs))
}

pub fn load_latest_reference(directory: &Path) -> Result<ReferenceBook> {
    let path = find_reference_file(directory)?;
    load_reference(&path)
}
