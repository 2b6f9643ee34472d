use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{ExportError, Result};

#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Debug)]
pub struct MonetaryAmount(Decimal);

impl MonetaryAmount {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Converts a spreadsheet number through its shortest round-trip rendering, so `100.1`
    /// becomes exactly `100.1` rather than the nearest binary fraction.
    pub fn from_f64(value: f64) -> Result<Self> {
        value
            .to_string()
            .parse::<Decimal>()
            .map(Self)
            .map_err(|_| ExportError::AmountOutOfRange(value.to_string()))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Two decimal places, comma separated: `1234.5` renders as `1234,50`.
    pub fn to_export_string(&self) -> String {
        let rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        format!("{:.2}", rounded).replace('.', ",")
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or_else(|| ExportError::AmountOutOfRange(format!("{} + {}", self.0, rhs.0)))
    }

    pub fn checked_mul(self, rhs: Decimal) -> Result<Self> {
        self.0
            .checked_mul(rhs)
            .map(Self)
            .ok_or_else(|| ExportError::AmountOutOfRange(format!("{} * {}", self.0, rhs)))
    }
}

/// One spreadsheet cell, reduced to what the report rules care about.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    /// Formula errors such as `#DIV/0!`. Never numeric.
    Error(String),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// `None` unless the cell holds a finite number. A number too large for a decimal amount
    /// is an error, never a skipped row.
    pub fn amount(&self) -> Option<Result<MonetaryAmount>> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(MonetaryAmount::from_f64(*n)),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) | Cell::Error(s) => write!(f, "{}", s),
            // integral floats print without a fractional part
            Cell::Number(n) => write!(f, "{}", n),
        }
    }
}

/// A report row with its leading empty cells removed. Fields are addressed by position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawLine(Vec<Cell>);

impl RawLine {
    pub fn from_cells(cells: Vec<Cell>) -> Self {
        Self(cells.into_iter().skip_while(Cell::is_empty).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Cell> {
        self.0.get(idx)
    }

    /// Rendered cell text, empty when the row is too short.
    pub fn text(&self, idx: usize) -> String {
        self.get(idx).map(Cell::to_string).unwrap_or_default()
    }

    pub fn amount(&self, idx: usize) -> Option<Result<MonetaryAmount>> {
        self.get(idx).and_then(Cell::amount)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Fund {
    #[default]
    None,
    ECommerce,
    CStore,
}

impl Fund {
    pub fn as_str(&self) -> &'static str {
        match self {
            Fund::None => "",
            Fund::ECommerce => "E_COMMERCE",
            Fund::CStore => "CSTORE",
        }
    }
}

impl fmt::Display for Fund {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VatCode {
    /// No VAT.
    Z0,
    /// VAT included.
    Z5,
}

impl VatCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VatCode::Z0 => "Z0",
            VatCode::Z5 => "Z5",
        }
    }
}

/// A payment request ("RS") as built by the rules, before output formatting.
///
/// The last four fields only exist while records are built and aggregated; they are dropped
/// when the record is projected to its export form.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
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
    pub vat_code: Option<VatCode>,
    pub main_account: String,
    pub amount: MonetaryAmount,
    pub personnel_number: String,
    pub block_code: String,
    pub position_text: String,
    pub contract_code: String,
    pub header_text: String,
    pub fund: Fund,

    pub reference_year: i32,
    pub reference_month: u32,
    pub object_name: String,
    pub tag: String,
}

impl PaymentRequest {
    pub fn map_amount<F: FnOnce(MonetaryAmount) -> MonetaryAmount>(&self, f: F) -> Self {
        Self {
            amount: f(self.amount),
            ..self.clone()
        }
    }
}
