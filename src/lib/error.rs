use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("rules file error: {0}")]
    Rules(#[from] serde_json::Error),

    #[error("sheet '{sheet}' not found in '{}'", .path.display())]
    SheetNotFound { path: PathBuf, sheet: String },

    #[error("no reference file found in '{}'", .0.display())]
    ReferenceNotFound(PathBuf),

    #[error("unknown object code '{code}' on sheet '{sheet}'")]
    UnknownObjectCode { code: String, sheet: String },

    #[error("amount out of range: {0}")]
    AmountOutOfRange(String),

    #[error("cannot derive a reporting period from run date {0}")]
    InvalidRunDate(chrono::NaiveDate),
}

pub type Result<T> = std::result::Result<T, ExportError>;
