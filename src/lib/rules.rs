use rust_decimal::Decimal;

use crate::{
    aggregate::sum_by_identity,
    config::RuleSet,
    error::Result,
    reference::ReferenceBook,
    types::{Fund, MonetaryAmount, PaymentRequest, RawLine, VatCode},
};

// Column positions after leading blanks are stripped.
const COMMISSION_MIN_LEN: usize = 16;
const COMMISSION_OBJECT_CODE: usize = 0;
const COMMISSION_CODE_CHECK: usize = 1;
const COMMISSION_TAG: usize = 16;

const COLLECTION_COUNTERPARTY: usize = 4;
const COLLECTION_AMOUNT: usize = 10;
const COLLECTION_CONTRACT: usize = 12;
const COLLECTION_CREDITOR: usize = 14;

const RECOUNT_COUNTERPARTY: usize = 5;
const RECOUNT_AMOUNT: usize = 11;
const RECOUNT_CONTRACT: usize = 13;
const RECOUNT_CREDITOR: usize = 15;

const ACQUIRING_MIN_LEN: usize = 6;
const ACQUIRING_OBJECT_CODE: usize = 1;
const ACQUIRING_AMOUNT: usize = 5;

const CASH_SERVICES_MIN_LEN: usize = 8;
const CASH_SERVICES_AMOUNT: usize = 6;

const MAX_OBJECT_CODE_LEN: usize = 4;

const ACQUIRING_BUSINESS_UNIT: &str = "2020";

fn vat_markup() -> Decimal {
    Decimal::new(12, 1)
}

fn has_short_code(line: &RawLine, idx: usize) -> bool {
    line.text(idx).chars().count() <= MAX_OBJECT_CODE_LEN
}

/// Collected and recounted amounts of a commission row. `None` marks a row that is not data.
fn commission_amounts(line: &RawLine) -> Option<Result<(MonetaryAmount, MonetaryAmount)>> {
    if line.len() < COMMISSION_MIN_LEN || !has_short_code(line, COMMISSION_CODE_CHECK) {
        return None;
    }
    let collected = line.amount(COLLECTION_AMOUNT)?;
    let recounted = line.amount(RECOUNT_AMOUNT)?;
    Some(collected.and_then(|c| recounted.map(|r| (c, r))))
}

fn acquiring_amount(line: &RawLine) -> Option<Result<MonetaryAmount>> {
    if line.len() < ACQUIRING_MIN_LEN || !has_short_code(line, ACQUIRING_OBJECT_CODE) {
        return None;
    }
    line.amount(ACQUIRING_AMOUNT)
}

fn cash_services_amount(line: &RawLine) -> Option<Result<MonetaryAmount>> {
    if line.len() < CASH_SERVICES_MIN_LEN {
        return None;
    }
    line.amount(CASH_SERVICES_AMOUNT)
}

fn header(label: &str, base: &PaymentRequest, subject: &str) -> String {
    format!(
        "{} {}.{:02} {}",
        label, base.reference_year, base.reference_month, subject
    )
}

/// Fund of a collection/recount row. The store marker is matched case-sensitively here.
pub fn commission_fund(object_name: &str, rules: &RuleSet) -> Fund {
    if object_name.contains(&rules.e_commerce_marker) {
        Fund::ECommerce
    } else if object_name.contains(&rules.cstore_marker) {
        Fund::CStore
    } else {
        Fund::None
    }
}

/// Fund of an acquiring row. The store marker is matched ignoring case.
pub fn acquiring_fund(object_name: &str, rules: &RuleSet) -> Fund {
    if object_name.contains(&rules.e_commerce_marker) {
        Fund::ECommerce
    } else if object_name
        .to_lowercase()
        .contains(&rules.cstore_marker.to_lowercase())
    {
        Fund::CStore
    } else {
        Fund::None
    }
}

/// Copies the base and adds the fields both requests of one commission row share.
pub fn with_shared_fields(
    base: &PaymentRequest,
    rules: &RuleSet,
    reference: &ReferenceBook,
    line: &RawLine,
) -> Result<PaymentRequest> {
    let code = line.text(COMMISSION_OBJECT_CODE);
    let object_name = reference.object_name(&code, &rules.sheets.commission)?;
    Ok(PaymentRequest {
        fund: commission_fund(object_name, rules),
        object_name: object_name.to_string(),
        tag: line.text(COMMISSION_TAG),
        ..base.clone()
    })
}

/// Collection request for one commission row. Amounts are billed with a 20% markup.
pub fn collection(
    base: &PaymentRequest,
    rules: &RuleSet,
    line: &RawLine,
    collected: MonetaryAmount,
) -> Result<PaymentRequest> {
    let counterparty = line.text(COLLECTION_COUNTERPARTY);
    let amount = collected.checked_mul(vat_markup())?;
    let header_text = header(&rules.labels.collection, base, &counterparty);
    let vat_code = if rules.is_non_vat(&counterparty) {
        VatCode::Z0
    } else {
        VatCode::Z5
    };

    Ok(PaymentRequest {
        pfm: format!("{}04", base.business_unit),
        fp: "135703".to_string(),
        creditor: line.text(COLLECTION_CREDITOR),
        vat_code: Some(vat_code),
        main_account: "36200000".to_string(),
        amount,
        position_text: format!("{} {} {}", header_text, base.tag, base.fund),
        contract_code: line.text(COLLECTION_CONTRACT),
        header_text,
        ..base.clone()
    })
}

/// Recount request for one commission row. Accepted counterparties are posted as doc type 08
/// without contract or tag.
pub fn recount(
    base: &PaymentRequest,
    rules: &RuleSet,
    line: &RawLine,
    recounted: MonetaryAmount,
) -> PaymentRequest {
    let counterparty = line.text(RECOUNT_COUNTERPARTY);
    let (doc_type, contract_code, tag) = if rules.is_accepted(&counterparty) {
        ("08", String::new(), String::new())
    } else {
        ("02", line.text(RECOUNT_CONTRACT), base.tag.clone())
    };
    let header_text = header(&rules.labels.recount, base, &counterparty);

    PaymentRequest {
        doc_type: doc_type.to_string(),
        pfm: format!("{}03", base.business_unit),
        fp: "136003".to_string(),
        creditor: line.text(RECOUNT_CREDITOR),
        vat_code: Some(VatCode::Z0),
        main_account: "37100120".to_string(),
        amount: recounted,
        position_text: format!("{} {} {}", header_text, tag, base.fund),
        contract_code,
        header_text,
        tag,
        ..base.clone()
    }
}

pub fn acquiring(
    base: &PaymentRequest,
    rules: &RuleSet,
    amount: MonetaryAmount,
    fund: Fund,
) -> PaymentRequest {
    let header_text = header(&rules.labels.acquiring, base, &base.business_unit);

    PaymentRequest {
        doc_type: "08".to_string(),
        business_unit: ACQUIRING_BUSINESS_UNIT.to_string(),
        pfm: "200003".to_string(),
        fp: "136103".to_string(),
        cost_center: "2020010300".to_string(),
        vat_code: Some(VatCode::Z0),
        main_account: "37100320".to_string(),
        amount,
        position_text: format!("{} {}", header_text, fund),
        header_text,
        fund,
        ..base.clone()
    }
}

pub fn cash_services(
    base: &PaymentRequest,
    rules: &RuleSet,
    amount: MonetaryAmount,
) -> PaymentRequest {
    let header_text = header(&rules.labels.cash_services, base, &base.business_unit);

    PaymentRequest {
        doc_type: "08".to_string(),
        pfm: format!("{}02", base.business_unit),
        fp: "135203".to_string(),
        vat_code: Some(VatCode::Z0),
        main_account: "37100100".to_string(),
        amount,
        position_text: header_text.clone(),
        header_text,
        ..base.clone()
    }
}

/// Collection and recount requests for the commission sheet, duplicates summed.
pub fn collection_recount_rows<I>(
    base: &PaymentRequest,
    rules: &RuleSet,
    reference: &ReferenceBook,
    lines: I,
) -> Result<Vec<PaymentRequest>>
where
    I: Iterator<Item = RawLine>,
{
    let pairs = lines
        .enumerate()
        .filter_map(|(idx, line)| match commission_amounts(&line) {
            Some(amounts) => Some((line, amounts)),
            None => {
                tracing::debug!("{}: row {} skipped", rules.sheets.commission, idx);
                None
            }
        })
        .map(|(line, amounts)| -> Result<[PaymentRequest; 2]> {
            let (collected, recounted) = amounts?;
            let shared = with_shared_fields(base, rules, reference, &line)?;
            Ok([
                collection(&shared, rules, &line, collected)?,
                recount(&shared, rules, &line, recounted),
            ])
        });

    let requests = pairs.flat_map(|pair| match pair {
        Ok(pair) => pair.into_iter().map(Ok).collect::<Vec<_>>(),
        Err(e) => vec![Err(e)],
    });

    sum_by_identity(requests)
}

/// Always three requests, one per fund, in the order none, E_COMMERCE, CSTORE.
pub fn acquiring_rows<I>(
    base: &PaymentRequest,
    rules: &RuleSet,
    reference: &ReferenceBook,
    lines: I,
) -> Result<Vec<PaymentRequest>>
where
    I: Iterator<Item = RawLine>,
{
    let mut total = MonetaryAmount::default();
    let mut e_commerce = MonetaryAmount::default();
    let mut cstore = MonetaryAmount::default();

    for (idx, line) in lines.enumerate() {
        let amount = match acquiring_amount(&line) {
            Some(amount) => amount?,
            None => {
                tracing::debug!("{}: row {} skipped", rules.sheets.acquiring, idx);
                continue;
            }
        };
        let code = line.text(ACQUIRING_OBJECT_CODE);
        let object_name = reference.object_name(&code, &rules.sheets.acquiring)?;
        match acquiring_fund(object_name, rules) {
            Fund::ECommerce => e_commerce = e_commerce.checked_add(amount)?,
            Fund::CStore => cstore = cstore.checked_add(amount)?,
            Fund::None => total = total.checked_add(amount)?,
        }
    }

    Ok(vec![
        acquiring(base, rules, total, Fund::None),
        acquiring(base, rules, e_commerce, Fund::ECommerce),
        acquiring(base, rules, cstore, Fund::CStore),
    ])
}

/// A single request carrying the total of the cash-service sheet.
pub fn cash_services_rows<I>(
    base: &PaymentRequest,
    rules: &RuleSet,
    lines: I,
) -> Result<Vec<PaymentRequest>>
where
    I: Iterator<Item = RawLine>,
{
    let total = lines
        .enumerate()
        .filter_map(|(idx, line)| {
            let amount = cash_services_amount(&line);
            if amount.is_none() {
                tracing::debug!("{}: row {} skipped", rules.sheets.cash_services, idx);
            }
            amount
        })
        .try_fold(MonetaryAmount::default(), |acc, amount| {
            acc.checked_add(amount?)
        })?;

    Ok(vec![cash_services(base, rules, total)])
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;
    use crate::{base::create_base, error::ExportError, types::Cell};

    fn base() -> PaymentRequest {
        create_base("4950", "357690", NaiveDate::from_ymd_opt(2020, 4, 15).unwrap()).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn amount(s: &str) -> MonetaryAmount {
        MonetaryAmount::new(dec(s))
    }

    fn reference() -> ReferenceBook {
        ReferenceBook::from_pairs(vec![
            ("0101".to_string(), "Магазин 101".to_string()),
            ("0202".to_string(), "ООО Интернет 000".to_string()),
            ("0303".to_string(), "APPLE store".to_string()),
            ("0404".to_string(), "apple corner".to_string()),
        ])
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn commission_line(code: &str, counterparty: &str, amount: f64, tag: Option<&str>) -> RawLine {
        let mut cells = vec![
            text(code),
            text("01"),
            text("x"),
            text("x"),
            text(counterparty),
            text(counterparty),
            text("x"),
            text("x"),
            text("x"),
            text("x"),
            Cell::Number(amount),
            Cell::Number(amount / 2.0),
            text("K-1"),
            text("K-2"),
            Cell::Number(100200.0),
            Cell::Number(300400.0),
        ];
        if let Some(tag) = tag {
            cells.push(text(tag));
        }
        RawLine::from_cells(cells)
    }

    fn acquiring_line(code: &str, amount: Cell) -> RawLine {
        RawLine::from_cells(vec![
            text("1"),
            text(code),
            text("x"),
            text("x"),
            text("x"),
            amount,
        ])
    }

    fn cash_line(amount: Cell) -> RawLine {
        RawLine::from_cells(vec![
            text("a"),
            text("b"),
            text("c"),
            text("d"),
            text("e"),
            text("f"),
            amount,
            text("h"),
        ])
    }

    #[test]
    fn collection_adds_markup_and_vat() {
        let rules = RuleSet::default();
        let line = commission_line("0101", "BankX", 100.1, None);
        let shared = with_shared_fields(&base(), &rules, &reference(), &line).unwrap();
        let rs = collection(&shared, &rules, &line, amount("100.1")).unwrap();

        assert_eq!(rs.amount.value(), dec("120.12"));
        assert_eq!(rs.vat_code, Some(VatCode::Z5));
        assert_eq!(rs.pfm, "495004");
        assert_eq!(rs.fp, "135703");
        assert_eq!(rs.main_account, "36200000");
        assert_eq!(rs.doc_type, "02");
        assert_eq!(rs.contract_code, "K-1");
        assert_eq!(rs.creditor, "100200");
        assert_eq!(rs.header_text, "инкассация 2020.03 BankX");
        assert_eq!(rs.position_text, "инкассация 2020.03 BankX  ");
    }

    #[test]
    fn non_vat_counterparty_gets_z0() {
        let rules = RuleSet {
            non_vat_counterparties: vec!["BankX".to_string()],
            ..RuleSet::default()
        };
        let line = commission_line("0101", "BankX", 10.0, None);
        let rs = collection(&base(), &rules, &line, amount("10")).unwrap();
        assert_eq!(rs.vat_code, Some(VatCode::Z0));
    }

    #[test]
    fn recount_keeps_contract_for_regular_counterparty() {
        let rules = RuleSet::default();
        let line = commission_line("0101", "BankY", 100.0, Some("T1"));
        let shared = with_shared_fields(&base(), &rules, &reference(), &line).unwrap();
        let rs = recount(&shared, &rules, &line, amount("50"));

        assert_eq!(rs.doc_type, "02");
        assert_eq!(rs.contract_code, "K-2");
        assert_eq!(rs.tag, "T1");
        assert_eq!(rs.amount.value(), dec("50"));
        assert_eq!(rs.vat_code, Some(VatCode::Z0));
        assert_eq!(rs.pfm, "495003");
        assert_eq!(rs.creditor, "300400");
        assert_eq!(rs.position_text, "пересчёт 2020.03 BankY T1 ");
    }

    #[test]
    fn recount_for_accepted_counterparty_drops_contract_and_tag() {
        let rules = RuleSet::default();
        let line = commission_line("0101", "Альфа-Банк АО", 100.0, Some("T1"));
        let shared = with_shared_fields(&base(), &rules, &reference(), &line).unwrap();
        let rs = recount(&shared, &rules, &line, amount("50"));

        assert_eq!(rs.doc_type, "08");
        assert_eq!(rs.contract_code, "");
        assert_eq!(rs.tag, "");
        assert_eq!(rs.position_text, "пересчёт 2020.03 Альфа-Банк АО  ");
    }

    #[test]
    fn shared_fields_classify_fund_and_read_tag() {
        let rules = RuleSet::default();
        let refs = reference();

        let shared = |code: &str, tag: Option<&str>| {
            with_shared_fields(&base(), &rules, &refs, &commission_line(code, "B", 1.0, tag)).unwrap()
        };

        let ecom = shared("0202", Some("T"));
        assert_eq!(ecom.fund, Fund::ECommerce);
        assert_eq!(ecom.tag, "T");
        assert_eq!(ecom.object_name, "ООО Интернет 000");

        let store = shared("0303", None);
        assert_eq!(store.fund, Fund::CStore);
        assert_eq!(store.tag, "");

        // lowercase marker does not count for commission rows
        let plain = shared("0404", None);
        assert_eq!(plain.fund, Fund::None);
    }

    #[test]
    fn unknown_commission_code_is_fatal() {
        let rules = RuleSet::default();
        let lines = vec![commission_line("0999", "BankX", 1.0, None)];
        let result = collection_recount_rows(&base(), &rules, &reference(), lines.into_iter());
        assert!(matches!(
            result,
            Err(ExportError::UnknownObjectCode { ref code, ref sheet })
                if code == "0999" && sheet == "расчет комиссии"
        ));
    }

    #[test]
    fn invalid_commission_rows_are_skipped() {
        let rules = RuleSet::default();
        let valid = commission_line("0101", "BankX", 1.0, None);
        let non_numeric = RawLine::from_cells(
            (0..16)
                .map(|i| match i {
                    10 => Cell::Error("#DIV/0!".to_string()),
                    _ => valid.get(i).cloned().unwrap_or(Cell::Empty),
                })
                .collect(),
        );
        let lines = vec![
            RawLine::from_cells(vec![text("Header"), text("Long header")]),
            non_numeric,
            RawLine::from_cells(vec![text("0101"), Cell::Number(1.0)]),
        ];
        let rows = collection_recount_rows(&base(), &rules, &reference(), lines.into_iter()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn long_code_check_field_skips_commission_row() {
        let rules = RuleSet::default();
        let valid = commission_line("0101", "BankX", 10.0, None);
        let long_code = RawLine::from_cells(
            (0..16)
                .map(|i| match i {
                    1 => text("12345"),
                    _ => valid.get(i).cloned().unwrap_or(Cell::Empty),
                })
                .collect(),
        );
        assert_eq!(long_code.len(), 16);

        let lines = vec![valid, long_code];
        let rows = collection_recount_rows(&base(), &rules, &reference(), lines.into_iter()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].amount.value(), dec("12"));
        assert_eq!(rows[1].amount.value(), dec("5"));
    }

    #[test]
    fn collection_markup_overflow_is_an_error() {
        let rules = RuleSet::default();
        let lines = vec![commission_line("0101", "BankX", 7.0e28, None)];
        let result = collection_recount_rows(&base(), &rules, &reference(), lines.into_iter());
        assert!(matches!(result, Err(ExportError::AmountOutOfRange(_))));
    }

    #[test]
    fn commission_duplicates_are_summed() {
        let rules = RuleSet::default();
        let lines = vec![
            commission_line("0101", "BankX", 100.0, None),
            commission_line("0101", "BankX", 50.0, None),
        ];
        let rows = collection_recount_rows(&base(), &rules, &reference(), lines.into_iter()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].header_text, "инкассация 2020.03 BankX");
        assert_eq!(rows[0].amount.value(), dec("180"));
        assert_eq!(rows[1].header_text, "пересчёт 2020.03 BankX");
        assert_eq!(rows[1].amount.value(), dec("75"));
    }

    #[test]
    fn acquiring_splits_totals_by_fund() {
        let rules = RuleSet::default();
        let lines = vec![
            RawLine::from_cells(vec![text("Код"), text("Объект"), text("Сумма")]),
            acquiring_line("0202", Cell::Number(100.0)),
            acquiring_line("0101", Cell::Number(50.0)),
            acquiring_line("0404", Cell::Number(7.5)),
            acquiring_line("0101", Cell::Text("n/a".to_string())),
            acquiring_line("01010", Cell::Number(999.0)),
        ];
        let rows = acquiring_rows(&base(), &rules, &reference(), lines.into_iter()).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].fund, Fund::None);
        assert_eq!(rows[0].amount.value(), dec("50"));
        assert_eq!(rows[1].fund, Fund::ECommerce);
        assert_eq!(rows[1].amount.value(), dec("100"));
        assert_eq!(rows[2].fund, Fund::CStore);
        assert_eq!(rows[2].amount.value(), dec("7.5"));
    }

    #[test]
    fn acquiring_emits_zero_buckets() {
        let rules = RuleSet::default();
        let lines = vec![
            acquiring_line("0202", Cell::Number(100.0)),
            acquiring_line("0101", Cell::Number(50.0)),
        ];
        let rows = acquiring_rows(&base(), &rules, &reference(), lines.into_iter()).unwrap();

        let amounts: Vec<String> = rows.iter().map(|r| r.amount.to_export_string()).collect();
        assert_eq!(amounts, vec!["50,00", "100,00", "0,00"]);
    }

    #[test]
    fn acquiring_total_overflow_is_an_error() {
        let lines = vec![
            acquiring_line("0101", Cell::Number(5.0e28)),
            acquiring_line("0101", Cell::Number(5.0e28)),
        ];
        let result = acquiring_rows(&base(), &RuleSet::default(), &reference(), lines.into_iter());
        assert!(matches!(result, Err(ExportError::AmountOutOfRange(_))));
    }

    #[test]
    fn acquiring_overrides_routing() {
        let rs = acquiring(&base(), &RuleSet::default(), MonetaryAmount::default(), Fund::CStore);
        assert_eq!(rs.doc_type, "08");
        assert_eq!(rs.business_unit, "2020");
        assert_eq!(rs.pfm, "200003");
        assert_eq!(rs.fp, "136103");
        assert_eq!(rs.cost_center, "2020010300");
        assert_eq!(rs.main_account, "37100320");
        assert_eq!(rs.vat_code, Some(VatCode::Z0));
        assert_eq!(rs.header_text, "эквайринг 2020.03 4950");
        assert_eq!(rs.position_text, "эквайринг 2020.03 4950 CSTORE");
    }

    #[test]
    fn cash_services_sum_valid_rows_only() {
        let rules = RuleSet::default();
        let lines = vec![
            cash_line(Cell::Text("Сумма".to_string())),
            cash_line(Cell::Number(10.25)),
            cash_line(Cell::Number(0.1)),
            cash_line(Cell::Number(0.2)),
            cash_line(Cell::Error("#REF!".to_string())),
            RawLine::from_cells(vec![text("short"), Cell::Number(1000.0)]),
        ];
        let rows = cash_services_rows(&base(), &rules, lines.into_iter()).unwrap();

        assert_eq!(rows.len(), 1);
        let rs = &rows[0];
        assert_eq!(rs.amount.value(), dec("10.55"));
        assert_eq!(rs.doc_type, "08");
        assert_eq!(rs.pfm, "495002");
        assert_eq!(rs.fp, "135203");
        assert_eq!(rs.main_account, "37100100");
        assert_eq!(rs.header_text, "РКО 2020.03 4950");
        assert_eq!(rs.position_text, rs.header_text);
    }

    #[test]
    fn empty_cash_sheet_still_yields_one_request() {
        let rows = cash_services_rows(&base(), &RuleSet::default(), std::iter::empty()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, MonetaryAmount::default());
    }

    #[test]
    fn cash_amount_beyond_decimal_range_is_an_error() {
        let lines = vec![cash_line(Cell::Number(1.0e30))];
        let result = cash_services_rows(&base(), &RuleSet::default(), lines.into_iter());
        assert!(matches!(result, Err(ExportError::AmountOutOfRange(_))));
    }
}
