use proptest::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use sheetbind::{
    Coercer, ColumnConstraint, EnumConstant, EnumDescriptor, PatternDateTimeCodec, PickList,
    RawType, TargetType, TypedValue, UniqueTracker,
};
use sheetbind_common::{CellError, CellErrorKind};
use sheetbind_io::{CellData, CellValue};

fn any_target() -> impl Strategy<Value = TargetType> {
    prop_oneof![
        Just(TargetType::String),
        Just(TargetType::Boolean),
        Just(TargetType::Int),
        Just(TargetType::Long),
        Just(TargetType::Float),
        Just(TargetType::Double),
        Just(TargetType::Decimal),
        Just(TargetType::Date),
        Just(TargetType::DateTime),
        Just(TargetType::Time),
        Just(TargetType::enumeration(EnumDescriptor::new(
            "Gender",
            vec![EnumConstant::new("Male"), EnumConstant::new("Female")],
        ))),
    ]
}

fn blank_or_error() -> impl Strategy<Value = CellData> {
    prop_oneof![
        Just(CellData {
            value: None,
            formula: None,
            style: None,
        }),
        Just(CellData::from_value(CellValue::Empty)),
        Just(CellData::from_value(CellValue::Error(CellError::new(
            CellErrorKind::Value
        )))),
        Just(CellData::from_value(CellValue::Error(CellError::new(
            CellErrorKind::Div
        )))),
    ]
}

proptest! {
    #[test]
    fn blank_and_error_cells_never_coerce(cell in blank_or_error(), target in any_target()) {
        let codec = PatternDateTimeCodec::default();
        let coercer = Coercer::new(&codec);
        prop_assert_eq!(coercer.read_value(&cell, &target), None);
    }

    #[test]
    fn double_cells_keep_their_precision(n in -1.0e9f64..1.0e9, digits in 0u32..6) {
        let codec = PatternDateTimeCodec::default();
        let coercer = Coercer::new(&codec);
        let rendered = coercer.write_value(Some(&TypedValue::Double(n)), Some(RawType::Double), digits);
        prop_assert!(rendered.failure.is_none());

        let cell = CellData { value: rendered.value, formula: None, style: None };
        let Some(TypedValue::Decimal(read)) = coercer.read_value(&cell, &TargetType::Decimal) else {
            return Err(TestCaseError::fail("double cell did not read as a decimal"));
        };
        let read = read.to_f64().unwrap_or(f64::NAN);
        prop_assert!((read - n).abs() <= 0.5 * 10f64.powi(-(digits as i32)));
    }

    #[test]
    fn suggestion_lists_accept_anything(
        values in prop::collection::vec("[A-Za-z]{1,6}", 1..5),
        input in ".{0,12}",
        allow_multiple in any::<bool>(),
    ) {
        let rule = ColumnConstraint::from(
            PickList::new(values).allow_multiple(allow_multiple).must_be_in_range(false),
        );
        prop_assert!(rule.is_valid(Some(&TypedValue::String(input))));
    }

    #[test]
    fn unique_fails_on_every_repeat_until_cleared(value in "[a-z]{1,8}", repeats in 1usize..6) {
        let mut seen = UniqueTracker::new();
        let value = TypedValue::String(value);
        prop_assert!(seen.check("code", &value));
        for _ in 0..repeats {
            prop_assert!(!seen.check("code", &value));
        }
        prop_assert!(seen.check("other", &value));
        seen.clear();
        prop_assert!(seen.check("code", &value));
    }

    #[test]
    fn integer_range_truncates_before_comparing(n in -500.0f64..500.0) {
        let rule = ColumnConstraint::integer_range(Some(-100), Some(100));
        let expected = (-100.0..=100.0).contains(&n.trunc());
        prop_assert_eq!(rule.is_valid(Some(&TypedValue::Double(n))), expected);
        prop_assert_eq!(rule.is_valid(Some(&TypedValue::String(n.to_string()))), expected);
    }

    #[test]
    fn enum_text_ignores_case(flips in prop::collection::vec(any::<bool>(), 4)) {
        let descriptor = EnumDescriptor::new(
            "Gender",
            vec![EnumConstant::new("Male"), EnumConstant::new("Female")],
        );
        let text: String = "male"
            .chars()
            .zip(flips)
            .map(|(c, upper)| if upper { c.to_ascii_uppercase() } else { c })
            .collect();
        prop_assert_eq!(descriptor.resolve(&text).map(|c| c.name.as_str()), Some("Male"));
    }
}
