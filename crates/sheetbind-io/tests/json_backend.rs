use chrono::NaiveDate;
use sheetbind_io::{
    CellData, CellFormat, CellKind, CellRange, CellValue, DataValidation, HorizontalAlign,
    IoError, JsonAdapter, SpreadsheetReader, SpreadsheetWriter, ValidationRule,
};

#[test]
fn cells_survive_a_file_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("book.json");

    let mut adapter = JsonAdapter::new();
    let style = adapter
        .register_style(&CellFormat::aligned(HorizontalAlign::Right).with_number_format("0.00"))
        .expect("register style");
    adapter
        .write_cell("People", 0, 0, CellData::from_value("Name"))
        .expect("write header");
    adapter
        .write_cell("People", 1, 1, CellData::from_value(12.5).with_style(style))
        .expect("write number");
    adapter
        .write_cell(
            "People",
            1,
            2,
            CellData::from_value(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
        )
        .expect("write date");
    adapter
        .write_cell("People", 1, 3, CellData::from_formula("=B2*2"))
        .expect("write formula");
    adapter.set_column_hidden("People", 3, true).expect("hide");
    adapter.set_column_width("People", 0, 12.0).expect("width");
    adapter
        .add_data_validation(
            "People",
            DataValidation {
                range: CellRange::column(1, 1, 10),
                rule: ValidationRule::IntegerBetween { min: 0, max: 120 },
                show_error_box: true,
                suppress_dropdown_arrow: false,
            },
        )
        .expect("validation");
    adapter.save_to_path(&path).expect("save");

    let mut reopened = JsonAdapter::open_path(&path).expect("reopen");
    assert_eq!(reopened.sheet_names().unwrap(), vec!["People".to_string()]);
    assert_eq!(reopened.sheet_bounds("People"), Some((2, 4)));

    let number = reopened
        .read_cell("People", 1, 1)
        .expect("read")
        .expect("cell present");
    assert_eq!(number.value, Some(CellValue::Number(12.5)));
    let format = reopened.cell_format("People", 1, 1).expect("style kept");
    assert_eq!(format.horizontal, Some(HorizontalAlign::Right));
    assert_eq!(format.number_format.as_deref(), Some("0.00"));

    let date = reopened.read_cell("People", 1, 2).unwrap().unwrap();
    assert_eq!(
        date.value,
        Some(CellValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()))
    );

    let formula = reopened.read_cell("People", 1, 3).unwrap().unwrap();
    assert_eq!(formula.kind(), CellKind::Formula);

    let sheet = reopened.read_sheet("People").expect("sheet");
    assert!(sheet.hidden_columns.contains(&3));
    assert_eq!(sheet.column_widths.get(&0), Some(&12.0));
    assert_eq!(sheet.validations.len(), 1);
    assert_eq!(reopened.validations("People")[0].range.to_string(), "B2:B11");
}

#[test]
fn equal_styles_share_an_id() {
    let mut adapter = JsonAdapter::new();
    let a = adapter
        .register_style(&CellFormat::aligned(HorizontalAlign::Center))
        .unwrap();
    let b = adapter
        .register_style(&CellFormat::aligned(HorizontalAlign::Center))
        .unwrap();
    let c = adapter.register_style(&CellFormat::default()).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn unknown_style_is_rejected() {
    let mut adapter = JsonAdapter::new();
    let err = adapter
        .write_cell("S", 0, 0, CellData::from_value(1).with_style(7))
        .expect_err("style 7 was never registered");
    assert!(matches!(err, IoError::UnknownStyle(7)));
}

#[test]
fn reads_hand_written_documents() {
    let json = r##"{
        "sheets": {
            "Data": {
                "cells": [
                    {"row": 0, "col": 0, "value": {"type": "Text", "value": "x"}},
                    {"row": 2, "col": 1, "value": {"type": "Error", "value": "#N/A"}},
                    {"row": 3, "col": 0, "value": {"type": "Date", "value": "not-a-date"}}
                ]
            }
        }
    }"##;
    let mut adapter = JsonAdapter::from_json_str(json).expect("parse");
    assert_eq!(adapter.sheet_bounds("Data"), Some((4, 2)));
    let err = adapter.read_cell("Data", 2, 1).unwrap().unwrap();
    assert_eq!(err.kind(), CellKind::Error);
    let bad_date = adapter.read_cell("Data", 3, 0).unwrap().unwrap();
    assert_eq!(bad_date.value, Some(CellValue::Text("not-a-date".into())));
    assert!(adapter.read_cell("Data", 9, 9).unwrap().is_none());
    assert!(matches!(
        adapter.read_sheet("Missing"),
        Err(IoError::SheetNotFound(_))
    ));
}

#[test]
fn clear_and_rename() {
    let mut adapter = JsonAdapter::new();
    adapter.append_row("A", 0, ["a", "b", "c"]);
    adapter.clear_range("A", (0, 1), (0, 2)).unwrap();
    assert_eq!(adapter.read_range("A", (0, 0), (0, 5)).unwrap().len(), 1);
    adapter.rename_sheet("A", "B").unwrap();
    assert!(adapter.read_cell("B", 0, 0).unwrap().is_some());
    assert!(adapter.rename_sheet("A", "C").is_err());
}
