use std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};

use ::serde::Serialize;
use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};

use crate::{
    config::FIELDNAMES,
    error::{ExportError, Result},
    types::{Cell, PaymentRequest, RawLine},
};

pub fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::DateTime(d) => Cell::Number(d.as_f64()),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::Error(e) => Cell::Error(e.to_string()),
    }
}

/// An open report workbook. The file handle is released when this value is dropped, so every
/// sheet must be read through it before it goes out of scope.
pub struct ReportWorkbook {
    path: PathBuf,
    sheets: Sheets<BufReader<File>>,
}

impl ReportWorkbook {
    pub fn open(path: &Path) -> Result<Self> {
        let sheets = open_workbook_auto(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            sheets,
        })
    }

    pub fn range(&mut self, sheet: &str) -> Result<Range<Data>> {
        if !self.sheets.sheet_names().iter().any(|name| name == sheet) {
            return Err(ExportError::SheetNotFound {
                path: self.path.clone(),
                sheet: sheet.to_string(),
            });
        }
        Ok(self.sheets.worksheet_range(sheet)?)
    }

    pub fn rows(&mut self, sheet: &str) -> Result<SheetRows> {
        Ok(SheetRows::new(self.range(sheet)?))
    }
}

/// Rows of one sheet, header included, with leading empty cells stripped.
///
/// Single pass: the iterator consumes its position and cannot be rewound.
pub struct SheetRows {
    range: Range<Data>,
    next: usize,
}

impl SheetRows {
    pub fn new(range: Range<Data>) -> Self {
        Self { range, next: 0 }
    }
}

impl Iterator for SheetRows {
    type Item = RawLine;

    fn next(&mut self) -> Option<Self::Item> {
        let (height, width) = self.range.get_size();
        if self.next >= height {
            return None;
        }
        let row = self.next;
        self.next += 1;
        let cells = (0..width)
            .map(|col| self.range.get((row, col)).map(to_cell).unwrap_or(Cell::Empty))
            .collect();
        Some(RawLine::from_cells(cells))
    }
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct PaymentRequestEntity {
    pub group_code: u32,
    pub doc_type: String,
    pub date_period: String,
    pub date_doc: String,
    pub business_unit: String,
    pub currency: String,
    pub pfm: String,
    pub fp: String,
    pub cost_center: String,
    pub creditor: String,
    pub date_pay: String,
    pub calc_type: String,
    pub vat_code: String,
    pub main_account: String,
    pub amount: String,
    pub personnel_number: String,
    pub block_code: String,
    pub position_text: String,
    pub contract_code: String,
    pub header_text: String,
    pub fund: String,
}

impl PaymentRequestEntity {
    /// Keeps only the exported columns. Amount gets its comma-decimal form and the creditor
    /// loses any fractional suffix picked up from a numeric cell.
    pub fn from_request(request: PaymentRequest, group_code: u32) -> Self {
        let creditor = match request.creditor.split_once('.') {
            Some((integral, _)) => integral.to_string(),
            None => request.creditor,
        };
        Self {
            group_code,
            doc_type: request.doc_type,
            date_period: request.date_period,
            date_doc: request.date_doc,
            business_unit: request.business_unit,
            currency: request.currency,
            pfm: request.pfm,
            fp: request.fp,
            cost_center: request.cost_center,
            creditor,
            date_pay: request.date_pay,
            calc_type: request.calc_type,
            vat_code: request
                .vat_code
                .map(|v| v.as_str().to_string())
                .unwrap_or_default(),
            main_account: request.main_account,
            amount: request.amount.to_export_string(),
            personnel_number: request.personnel_number,
            block_code: request.block_code,
            position_text: request.position_text,
            contract_code: request.contract_code,
            header_text: request.header_text,
            fund: request.fund.as_str().to_string(),
        }
    }
}

/// Renders the batch as semicolon separated text. The header line never depends on the
/// records, so an empty batch still yields a valid header-only file.
pub fn output_csv(records: &[PaymentRequestEntity]) -> Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(vec![]);

    wtr.write_record(FIELDNAMES)?;
    for record in records {
        wtr.serialize(record)?;
    }

    wtr.flush()?;
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Writes next to the target first and renames, so a failed run never leaves a truncated file.
pub fn write_output(path: &Path, content: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Err(e) = fs::write(&tmp, content).and_then(|_| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
