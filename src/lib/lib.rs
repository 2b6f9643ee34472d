mod aggregate;
mod base;
mod config;
mod error;
mod io;
mod process;
mod reference;
mod rules;
mod types;
mod utils;

use std::path::PathBuf;

use chrono::NaiveDate;

use io::{write_output, ReportWorkbook};
use process::process;
use rules::{acquiring_rows, cash_services_rows, collection_recount_rows};

pub use base::create_base;
pub use config::{HeaderLabels, RuleSet, SheetNames, FIELDNAMES};
pub use error::{ExportError, Result};
pub use io::{output_csv, PaymentRequestEntity};
pub use reference::{load_latest_reference, ReferenceBook};
pub use types::{Cell, Fund, MonetaryAmount, PaymentRequest, RawLine, VatCode};

/// Rows of the three report sheets, each read once.
pub struct ReportSheets {
    pub commission: Box<dyn Iterator<Item = RawLine>>,
    pub acquiring: Box<dyn Iterator<Item = RawLine>>,
    pub cash_services: Box<dyn Iterator<Item = RawLine>>,
}

pub struct RunParameters {
    pub report_path: PathBuf,
    pub business_unit: String,
    pub personnel_number: String,
    pub reference_dir: PathBuf,
    pub output_path: PathBuf,
    pub run_date: NaiveDate,
    pub rules: RuleSet,
}

/// Turns report rows into the sorted, grouped export batch. Batches are concatenated in the
/// order collection/recount, acquiring, cash services before sorting.
pub fn build_payment_requests(
    base: &PaymentRequest,
    rules: &RuleSet,
    reference: &ReferenceBook,
    sheets: ReportSheets,
) -> Result<Vec<PaymentRequestEntity>> {
    let mut requests = collection_recount_rows(base, rules, reference, sheets.commission)?;
    tracing::info!("{} collection/recount requests", requests.len());

    requests.extend(acquiring_rows(base, rules, reference, sheets.acquiring)?);
    requests.extend(cash_services_rows(base, rules, sheets.cash_services)?);

    Ok(process(requests))
}

/// Runs the whole export and returns the number of records written. Nothing is written unless
/// every sheet was processed.
pub fn export_payment_requests(params: &RunParameters) -> Result<usize> {
    let reference = load_latest_reference(&params.reference_dir)?;
    let base = create_base(&params.business_unit, &params.personnel_number, params.run_date)?;
    let sheet_names = &params.rules.sheets;

    let sheets = {
        let mut workbook = ReportWorkbook::open(&params.report_path)?;
        ReportSheets {
            commission: Box::new(workbook.rows(&sheet_names.commission)?),
            acquiring: Box::new(workbook.rows(&sheet_names.acquiring)?),
            cash_services: Box::new(workbook.rows(&sheet_names.cash_services)?),
        }
    };

    let records = build_payment_requests(&base, &params.rules, &reference, sheets)?;
    let content = output_csv(&records)?;
    write_output(&params.output_path, &content)?;

    tracing::info!(
        "wrote {} payment requests to {}",
        records.len(),
        params.output_path.display()
    );
    Ok(records.len())
}
