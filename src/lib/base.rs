use chrono::{Datelike, NaiveDate};

use crate::{
    error::{ExportError, Result},
    types::{Fund, MonetaryAmount, PaymentRequest},
};

const DATE_FORMAT: &str = "%d.%m.%Y";

/// First and last day of the calendar month before `run_date`.
fn previous_month(run_date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let last_day = run_date.with_day(1)?.pred_opt()?;
    let first_day = last_day.with_day(1)?;
    Some((first_day, last_day))
}

/// Builds the template every payment request starts from.
pub fn create_base(
    business_unit: &str,
    personnel_number: &str,
    run_date: NaiveDate,
) -> Result<PaymentRequest> {
    let (first_day, last_day) =
        previous_month(run_date).ok_or(ExportError::InvalidRunDate(run_date))?;

    Ok(PaymentRequest {
        group_code: 1,
        doc_type: "02".to_string(),
        date_period: first_day.format(DATE_FORMAT).to_string(),
        date_doc: last_day.format(DATE_FORMAT).to_string(),
        business_unit: business_unit.to_string(),
        currency: "RUB".to_string(),
        pfm: String::new(),
        fp: String::new(),
        cost_center: format!("{}010300", business_unit),
        creditor: String::new(),
        date_pay: run_date.format(DATE_FORMAT).to_string(),
        calc_type: "1".to_string(),
        vat_code: None,
        main_account: String::new(),
        amount: MonetaryAmount::default(),
        personnel_number: personnel_number.to_string(),
        block_code: "1".to_string(),
        position_text: String::new(),
        contract_code: String::new(),
        header_text: String::new(),
        fund: Fund::None,
        reference_year: last_day.year(),
        reference_month: last_day.month(),
        object_name: String::new(),
        tag: String::new(),
    })
}
