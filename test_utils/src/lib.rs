use std::str;

/// Column titles the accounting import expects, in order.
pub const EXPECTED_HEADER: [&str; 21] = [
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

fn writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(vec![])
}

// Only used during testing so no need to return result
pub fn create_csv(rows: Vec<[&'static str; 21]>) -> String {
    let mut wtr = writer();
    wtr.write_record(EXPECTED_HEADER).unwrap();
    for row in rows {
        wtr.write_record(row).unwrap();
    }
    wtr.flush().unwrap();
    String::from_utf8(wtr.into_inner().unwrap()).unwrap()
}

/// Splits an export into its header and its records.
pub fn parse_csv(data: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_reader(data.as_bytes());
    let mut rows = rdr
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect::<Vec<String>>());
    let header = rows.next().expect("export has no header line");
    (header, rows.collect())
}

pub fn assert_header_matches(data: &str) {
    let (header, _) = parse_csv(data);
    assert_eq!(header, EXPECTED_HEADER.map(str::to_string).to_vec());
}

/// Values of one named column, record by record.
pub fn column(data: &str, name: &str) -> Vec<String> {
    let idx = EXPECTED_HEADER
        .iter()
        .position(|h| *h == name)
        .unwrap_or_else(|| panic!("unknown column {}", name));
    let (_, records) = parse_csv(data);
    records.into_iter().map(|r| r[idx].clone()).collect()
}
