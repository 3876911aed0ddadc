use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sheetbind::{
    BindingError, CellEnum, ColumnConfiguration, ColumnConstraint, ConfigurationCache, RawType,
    ReadOptions, RecordBinding, SheetReader, SheetRecord, SheetWriter, WriteOptions,
};
use sheetbind_io::{CellValue, JsonAdapter, SpreadsheetReader};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Shift {
    Early,
    Late,
}

impl CellEnum for Shift {
    fn constants() -> &'static [Self] {
        &[Shift::Early, Shift::Late]
    }

    fn name(&self) -> &'static str {
        match self {
            Shift::Early => "Early",
            Shift::Late => "Late",
        }
    }

    fn custom_value(&self) -> Option<&'static str> {
        Some(match self {
            Shift::Early => "E",
            Shift::Late => "L",
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Employee {
    name: String,
    hired: Option<NaiveDate>,
    starts: Option<NaiveTime>,
    rate: Decimal,
    active: bool,
    shift: Option<Shift>,
}

impl SheetRecord for Employee {
    fn binding() -> Result<RecordBinding<Self>, BindingError> {
        RecordBinding::<Employee>::builder()
            .field(
                ColumnConfiguration::new("name", 0)
                    .title("Name")
                    .raw_type(RawType::String)
                    .constraint(ColumnConstraint::NotNull),
                |e| &e.name,
                |e| &mut e.name,
            )
            .field(
                ColumnConfiguration::new("hired", 1)
                    .title("Hired")
                    .raw_type(RawType::Date),
                |e| &e.hired,
                |e| &mut e.hired,
            )
            .field(
                ColumnConfiguration::new("starts", 2)
                    .title("Starts")
                    .raw_type(RawType::Time),
                |e| &e.starts,
                |e| &mut e.starts,
            )
            .field(
                ColumnConfiguration::new("rate", 3)
                    .title("Rate")
                    .raw_type(RawType::Double)
                    .constraint(ColumnConstraint::FixedPrecision { digits: 2 }),
                |e| &e.rate,
                |e| &mut e.rate,
            )
            .field(
                ColumnConfiguration::new("active", 4)
                    .title("Active")
                    .raw_type(RawType::Boolean),
                |e| &e.active,
                |e| &mut e.active,
            )
            .enum_field::<Shift>(
                ColumnConfiguration::new("shift", 5)
                    .title("Shift")
                    .raw_type(RawType::PickList),
                |e| e.shift,
                |e, v| e.shift = v,
            )
            .build()
    }
}

fn staff() -> Vec<Employee> {
    vec![
        Employee {
            name: "Alice".into(),
            hired: NaiveDate::from_ymd_opt(2021, 4, 1),
            starts: NaiveTime::from_hms_opt(8, 30, 0),
            rate: Decimal::new(2_550, 2),
            active: true,
            shift: Some(Shift::Early),
        },
        Employee {
            name: "Bob".into(),
            hired: None,
            starts: None,
            rate: Decimal::new(19, 0),
            active: false,
            shift: Some(Shift::Late),
        },
    ]
}

#[test]
fn records_survive_a_write_read_cycle() {
    let cache = ConfigurationCache::new();
    let binding = cache.get_or_build::<Employee>().expect("binding");

    let mut book = JsonAdapter::new();
    let summary = SheetWriter::default()
        .write_records(&mut book, "Staff", &binding, &staff())
        .expect("write");
    assert_eq!(summary.rows_written, 2);
    let shift = book.read_cell("Staff", 1, 5).expect("read").and_then(|c| c.value);
    assert_eq!(shift, Some(CellValue::Text("E".into())));

    let outcome = SheetReader::default()
        .read_records(&mut book, "Staff", &binding)
        .expect("read");
    assert!(outcome.is_complete(), "{:?}", outcome.error);
    assert_eq!(outcome.records, staff());
}

#[test]
fn cache_builds_each_type_once() {
    let cache = ConfigurationCache::new();
    assert!(cache.is_empty());
    let first = cache.get_or_build::<Employee>().expect("binding");
    let second = cache.get_or_build::<Employee>().expect("binding");
    assert!(Arc::ptr_eq(&first, &second));
    assert!(cache.contains::<Employee>());
    assert_eq!(cache.len(), 1);

    cache.clear();
    assert!(!cache.contains::<Employee>());
    let rebuilt = cache.get_or_build::<Employee>().expect("binding");
    assert!(!Arc::ptr_eq(&first, &rebuilt));
}

#[test]
fn separate_caches_do_not_share_entries() {
    let a = ConfigurationCache::new();
    let b = ConfigurationCache::new();
    a.get_or_build::<Employee>().expect("binding");
    assert!(b.is_empty());
}

#[test]
fn typed_reads_reuse_the_binding_constraints() {
    let cache = ConfigurationCache::new();
    let binding = cache.get_or_build::<Employee>().expect("binding");
    let mut book = JsonAdapter::new();
    book.append_row("Staff", 0, ["Name", "Hired", "Starts", "Rate"]);
    book.append_row("Staff", 1, ["Cleo", "2020-01-02", "09:00", "12.345"]);

    let outcome = SheetReader::new(ReadOptions::default())
        .read_records(&mut book, "Staff", &binding)
        .expect("read");
    assert!(outcome.records.is_empty());
    let error = outcome.error.expect("rate has three decimals");
    assert_eq!(error.record.name, "Cleo");
    assert_eq!(error.cell_errors[0].property(), Some("rate"));
    assert_eq!(error.cell_errors[0].rule, "record");
    assert!(error.cell_errors[0]
        .message
        .starts_with("Row 2, column \"Rate\": "));
}

#[test]
fn write_options_shift_the_data_rows() {
    let cache = ConfigurationCache::new();
    let binding = cache.get_or_build::<Employee>().expect("binding");
    let mut book = JsonAdapter::new();
    let summary = SheetWriter::new(WriteOptions {
        first_row: 4,
        sub_header: true,
        ..WriteOptions::default()
    })
    .write_records(&mut book, "Staff", &binding, &staff())
    .expect("write");
    assert_eq!(summary.first_data_row, 6);

    let outcome = SheetReader::new(ReadOptions::starting_at(6))
        .read_records(&mut book, "Staff", &binding)
        .expect("read");
    assert_eq!(outcome.records.len(), 2);
}

#[test]
fn records_survive_a_saved_workbook() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("staff.json");
    let cache = ConfigurationCache::new();
    let binding = cache.get_or_build::<Employee>().expect("binding");

    let mut book = JsonAdapter::new();
    SheetWriter::default()
        .write_records(&mut book, "Staff", &binding, &staff())
        .expect("write");
    book.save_to_path(&path).expect("save");

    let mut reopened = JsonAdapter::open_path(&path).expect("open");
    let outcome = SheetReader::default()
        .read_records(&mut reopened, "Staff", &binding)
        .expect("read");
    assert_eq!(outcome.records, staff());
}
