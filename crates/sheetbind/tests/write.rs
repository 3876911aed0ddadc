use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sheetbind::{
    ColumnConfiguration, ColumnConstraint, MapRecord, Money, PickList, RawType, SheetWriter,
    TargetType, TypedValue, WriteOptions,
};
use sheetbind_io::{
    CellRange, CellValue, HorizontalAlign, JsonAdapter, SpreadsheetReader, ValidationRule,
};

fn columns() -> Vec<ColumnConfiguration> {
    vec![
        ColumnConfiguration::new("name", 0)
            .title("Name")
            .label("Full name")
            .sample("Alice")
            .target(TargetType::String)
            .raw_type(RawType::String),
        ColumnConfiguration::new("age", 1)
            .title("Age")
            .target(TargetType::Int)
            .raw_type(RawType::Integer)
            .constraint(ColumnConstraint::integer_range(Some(0), Some(120))),
        ColumnConfiguration::new("salary", 2)
            .title("Salary")
            .target(TargetType::Decimal)
            .raw_type(RawType::Double)
            .constraint(ColumnConstraint::FixedPrecision { digits: 2 }),
        ColumnConfiguration::new("gender", 3)
            .title("Gender")
            .raw_type(RawType::PickList)
            .constraint(PickList::new(["M", "F"]).into()),
        ColumnConfiguration::new("internal_id", 4)
            .title("Internal id")
            .target(TargetType::Long)
            .writable(false)
            .hidden()
            .length(10),
    ]
}

fn record(name: &str, age: TypedValue, salary: TypedValue) -> MapRecord {
    BTreeMap::from([
        ("name".to_string(), Some(TypedValue::from(name))),
        ("age".to_string(), Some(age)),
        ("salary".to_string(), Some(salary)),
        ("gender".to_string(), Some(TypedValue::from("F"))),
        ("internal_id".to_string(), Some(TypedValue::Long(7))),
    ])
}

fn cell(book: &mut JsonAdapter, row: u32, col: u32) -> Option<CellValue> {
    book.read_cell("People", row, col)
        .expect("read cell")
        .and_then(|c| c.value)
}

#[test]
fn header_then_rows_in_input_order() {
    let mut book = JsonAdapter::new();
    let records = vec![
        record("Alice", TypedValue::Int(30), TypedValue::Decimal(Decimal::new(1_235, 1))),
        record("Bob", TypedValue::Int(41), TypedValue::Double(9.5)),
    ];
    let summary = SheetWriter::default()
        .write_maps(&mut book, "People", &columns(), &records)
        .expect("write");

    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.first_data_row, 1);
    assert_eq!(summary.formatting_failures, 0);
    assert_eq!(summary.hidden_columns, vec![4]);

    assert_eq!(cell(&mut book, 0, 0), Some(CellValue::Text("Name".into())));
    let header = book.cell_format("People", 0, 2).expect("header style");
    assert!(header.bold);
    assert_eq!(header.fill.as_deref(), Some("#00FF00"));

    assert_eq!(cell(&mut book, 1, 0), Some(CellValue::Text("Alice".into())));
    assert_eq!(cell(&mut book, 1, 1), Some(CellValue::Int(30)));
    assert_eq!(cell(&mut book, 1, 2), Some(CellValue::Number(123.5)));
    assert_eq!(cell(&mut book, 2, 0), Some(CellValue::Text("Bob".into())));

    let age = book.cell_format("People", 1, 1).expect("age style");
    assert_eq!(age.horizontal, Some(HorizontalAlign::Right));
    assert_eq!(age.number_format.as_deref(), Some("0"));
    assert!(!age.locked);
    assert!(age.wrap_text);

    let salary = book.cell_format("People", 1, 2).expect("salary style");
    assert_eq!(salary.number_format.as_deref(), Some("0.00"));

    let gender = book.cell_format("People", 1, 3).expect("gender style");
    assert_eq!(gender.horizontal, Some(HorizontalAlign::Center));
    assert_eq!(gender.number_format.as_deref(), Some("@"));

    assert!(book.cell_format("People", 1, 4).expect("id style").locked);
    assert_eq!(book.hidden_columns("People"), vec![4]);
    assert_eq!(book.column_width("People", 4), Some(24.0));
    assert_eq!(book.column_width("People", 0), None);
}

#[test]
fn money_values_carry_their_currency() {
    let mut book = JsonAdapter::new();
    let money = TypedValue::Money(Money::new(Decimal::new(1_050, 2), "EUR"));
    SheetWriter::default()
        .write_maps(
            &mut book,
            "People",
            &columns(),
            &[record("Alice", TypedValue::Int(30), money)],
        )
        .expect("write");
    assert_eq!(cell(&mut book, 1, 2), Some(CellValue::Number(10.5)));
    let format = book.cell_format("People", 1, 2).expect("salary style");
    assert_eq!(format.number_format.as_deref(), Some("0.00\"(EUR)\""));
}

#[test]
fn unfit_values_leave_the_cell_blank() {
    let mut book = JsonAdapter::new();
    let records = vec![record(
        "Alice",
        TypedValue::from("thirty"),
        TypedValue::Double(1.0),
    )];
    let summary = SheetWriter::default()
        .write_maps(&mut book, "People", &columns(), &records)
        .expect("write continues");
    assert_eq!(summary.formatting_failures, 1);
    assert_eq!(cell(&mut book, 1, 1), None);
    assert_eq!(cell(&mut book, 1, 0), Some(CellValue::Text("Alice".into())));
}

#[test]
fn annotations_cover_the_written_rows() {
    let mut book = JsonAdapter::new();
    let records = vec![
        record("Alice", TypedValue::Int(30), TypedValue::Double(1.0)),
        record("Bob", TypedValue::Int(41), TypedValue::Double(2.0)),
        record("Carol", TypedValue::Int(25), TypedValue::Double(3.0)),
    ];
    let summary = SheetWriter::default()
        .write_maps(&mut book, "People", &columns(), &records)
        .expect("write");
    assert_eq!(summary.annotations, 2);

    let validations = book.validations("People");
    assert_eq!(validations[0].range, CellRange::column(1, 1, 3));
    assert_eq!(
        validations[0].rule,
        ValidationRule::IntegerBetween { min: 0, max: 120 }
    );
    assert!(validations[0].show_error_box);
    assert_eq!(validations[1].range, CellRange::column(3, 1, 3));
    assert_eq!(
        validations[1].rule,
        ValidationRule::List {
            values: vec!["M".into(), "F".into()]
        }
    );
}

#[test]
fn empty_template_gets_labels_samples_and_annotations() {
    let mut book = JsonAdapter::new();
    let writer = SheetWriter::new(WriteOptions {
        sub_header: true,
        sample_row: true,
        min_annotated_rows: 100,
        ..WriteOptions::default()
    });
    let summary = writer
        .write_maps(&mut book, "People", &columns(), &[])
        .expect("write");

    assert_eq!(summary.rows_written, 0);
    assert_eq!(summary.first_data_row, 3);
    assert_eq!(cell(&mut book, 1, 0), Some(CellValue::Text("Full name".into())));
    assert_eq!(cell(&mut book, 2, 0), Some(CellValue::Text("Alice".into())));
    assert!(book.cell_format("People", 2, 1).expect("sample style").locked);
    assert_eq!(book.validations("People")[0].range, CellRange::column(1, 3, 102));
}

#[test]
fn nothing_to_annotate_without_rows() {
    let mut book = JsonAdapter::new();
    let summary = SheetWriter::default()
        .write_maps(&mut book, "People", &columns(), &[])
        .expect("write");
    assert_eq!(summary.annotations, 0);
    assert!(book.validations("People").is_empty());
    assert_eq!(book.sheet_names().expect("names"), vec!["People".to_string()]);
}

#[test]
fn list_records_follow_column_order() {
    let mut book = JsonAdapter::new();
    let columns = vec![
        ColumnConfiguration::new("flag", 0).raw_type(RawType::Boolean),
        ColumnConfiguration::new("share", 1).raw_type(RawType::Percent),
        ColumnConfiguration::new("plain", 2),
    ];
    let rows = vec![vec![
        Some(TypedValue::Boolean(true)),
        Some(TypedValue::Double(0.25)),
        Some(TypedValue::Long(12)),
    ]];
    SheetWriter::new(WriteOptions {
        header: false,
        ..WriteOptions::default()
    })
    .write_lists(&mut book, "People", &columns, &rows)
    .expect("write");

    assert_eq!(cell(&mut book, 0, 0), Some(CellValue::Boolean(true)));
    assert_eq!(cell(&mut book, 0, 1), Some(CellValue::Number(0.25)));
    assert_eq!(cell(&mut book, 0, 2), Some(CellValue::Int(12)));
    let share = book.cell_format("People", 0, 1).expect("percent style");
    assert_eq!(share.number_format.as_deref(), Some("0.00%"));
}
