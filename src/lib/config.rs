use std::{fs::File, io::BufReader, path::Path};

use serde::Deserialize;

use crate::error::Result;

/// Output header, in column order. Written verbatim as the first line of every export.
pub const FIELDNAMES: [&str; 21] = [
    "Код группировки",
    "Вид документа",
    "Дата проводки",
    "Дата документа",
    "БЕ",
    "Валюта",
    "ПФМ",
    "ФП",
    "МВЗ",
    "Кредитор",
    "К оплате",
    "Вид расчета",
    "Код НДС",
    "Основной счет",
    "Сумма с НДС",
    "Таб. Сотр.",
    "Код блокировки",
    "Текст позиции",
    "Внутренний номер договора для коммечреских закупок",
    "Текст заголовка документа",
    "Фонд",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub commission: String,
    pub acquiring: String,
    pub cash_services: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            commission: "расчет комиссии".to_string(),
            acquiring: "эквайринг".to_string(),
            cash_services: "РКО".to_string(),
        }
    }
}

/// Leading words of the document header text, one per transaction type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HeaderLabels {
    pub collection: String,
    pub recount: String,
    pub acquiring: String,
    pub cash_services: String,
}

impl Default for HeaderLabels {
    fn default() -> Self {
        Self {
            collection: "инкассация".to_string(),
            recount: "пересчёт".to_string(),
            acquiring: "эквайринг".to_string(),
            cash_services: "РКО".to_string(),
        }
    }
}

/// Business rules for one run. Built once and passed by reference into every rule builder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// Collection counterparties billed without VAT.
    pub non_vat_counterparties: Vec<String>,
    /// Recount counterparties whose requests are posted as doc type 08 without a contract.
    pub accept_counterparties: Vec<String>,
    /// Object names containing this go to the E_COMMERCE fund.
    pub e_commerce_marker: String,
    /// Object names containing this go to the CSTORE fund. Matched case-sensitively for
    /// collection/recount and case-insensitively for acquiring.
    pub cstore_marker: String,
    pub sheets: SheetNames,
    pub labels: HeaderLabels,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            non_vat_counterparties: Vec::new(),
            accept_counterparties: vec![
                "ПАО \"Сбербанк России\"".to_string(),
                "Альфа-Банк АО".to_string(),
                "Банк ВТБ (ПАО) г.Москва".to_string(),
            ],
            e_commerce_marker: "000".to_string(),
            cstore_marker: "APPLE".to_string(),
            sheets: SheetNames::default(),
            labels: HeaderLabels::default(),
        }
    }
}

impl RuleSet {
    /// Reads a rule set from JSON. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn is_non_vat(&self, counterparty: &str) -> bool {
        self.non_vat_counterparties.iter().any(|c| c == counterparty)
    }

    pub fn is_accepted(&self, counterparty: &str) -> bool {
        self.accept_counterparties.iter().any(|c| c == counterparty)
    }
}
