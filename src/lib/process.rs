use crate::{io::PaymentRequestEntity, types::PaymentRequest};

/// Stable sort: requests sharing a header keep their relative order.
pub fn sort_by_header(mut requests: Vec<PaymentRequest>) -> Vec<PaymentRequest> {
    requests.sort_by(|a, b| a.header_text.cmp(&b.header_text));
    requests
}

/// Sorts the batch, numbers the groups and projects every request to its export form.
///
/// Group codes start at 1 for the first request whatever it carried before, and go up by one
/// each time the header differs from the previous request's.
pub fn process(requests: Vec<PaymentRequest>) -> Vec<PaymentRequestEntity> {
    let mut group_code = 0;
    let mut previous_header: Option<String> = None;

    sort_by_header(requests)
        .into_iter()
        .map(|rs| {
            if previous_header.as_deref() != Some(rs.header_text.as_str()) {
                group_code += 1;
            }
            previous_header = Some(rs.header_text.clone());
            PaymentRequestEntity::from_request(rs, group_code)
        })
        .collect()
}
