use im::{HashMap, Vector};

use crate::{
    error::{ExportError, Result},
    types::PaymentRequest,
    utils::{MapAtImmut, PushImmut},
};

const KEY_SEPARATOR: &str = "\u{1f}";

/// Every field except the amount and the object name, in declaration order.
pub fn identity_key(rs: &PaymentRequest) -> String {
    [
        rs.group_code.to_string(),
        rs.doc_type.clone(),
        rs.date_period.clone(),
        rs.date_doc.clone(),
        rs.business_unit.clone(),
        rs.currency.clone(),
        rs.pfm.clone(),
        rs.fp.clone(),
        rs.cost_center.clone(),
        rs.creditor.clone(),
        rs.date_pay.clone(),
        rs.calc_type.clone(),
        rs.vat_code.map(|v| v.as_str()).unwrap_or_default().to_string(),
        rs.main_account.clone(),
        rs.personnel_number.clone(),
        rs.block_code.clone(),
        rs.position_text.clone(),
        rs.contract_code.clone(),
        rs.header_text.clone(),
        rs.fund.as_str().to_string(),
        rs.reference_year.to_string(),
        rs.reference_month.to_string(),
        rs.tag.clone(),
    ]
    .join(KEY_SEPARATOR)
}

/// Merges requests sharing an identity key, summing their amounts into the first one seen.
/// Output keeps first-appearance order. The first error stops the fold.
pub fn sum_by_identity<I>(mut requests: I) -> Result<Vec<PaymentRequest>>
where
    I: Iterator<Item = Result<PaymentRequest>>,
{
    let (summed, _) = requests.try_fold(
        (Vector::new(), HashMap::new()),
        |(summed, index): (Vector<PaymentRequest>, HashMap<String, usize>), rs| {
            let rs = rs?;
            let key = identity_key(&rs);
            let existing = index.get(&key).copied();
            let next = match existing {
                Some(idx) => {
                    let total = summed[idx].amount.checked_add(rs.amount)?;
                    let merged = summed.map_at(idx, |kept| kept.map_amount(|_| total));
                    (merged, index)
                }
                None => {
                    let idx = summed.len();
                    (summed.push(rs), index.update(key, idx))
                }
            };
            Ok::<_, ExportError>(next)
        },
    )?;

    Ok(summed.into_iter().collect())
}
