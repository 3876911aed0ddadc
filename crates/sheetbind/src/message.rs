//! Message templates for validation errors.
//!
//! A cell error message is the cell wrapper (`validation.invalid_cell` or
//! `validation.invalid_cell_numbered`) followed by the rule's own template,
//! both with `{placeholder}` substitution.

use serde::Deserialize;
use std::borrow::Cow;
use std::collections::BTreeMap;

pub const INVALID_CELL: &str = "validation.invalid_cell";
pub const INVALID_CELL_NUMBERED: &str = "validation.invalid_cell_numbered";
pub const INVALID_ROW: &str = "validation.invalid_row";

/// Resolves a template key for a locale.
pub trait MessageCatalog: Send + Sync {
    fn template(&self, key: &str, locale: Option<&str>) -> Option<Cow<'_, str>>;

    /// Template for `key` with `args` substituted. Unknown keys render as the
    /// key itself.
    fn render(&self, key: &str, locale: Option<&str>, args: &[(&str, String)]) -> String {
        match self.template(key, locale) {
            Some(template) => interpolate(&template, args),
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!(key, ?locale, "no message template");
                interpolate(key, args)
            }
        }
    }
}

/// Replace every `{name}` in `template` with its value from `args`.
///
/// One pass over the template: substituted values are never rescanned, and
/// placeholders without an argument are kept as written.
pub fn interpolate(template: &str, args: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            rest = &rest[open..];
            break;
        };
        let name = &after[..close];
        match args.iter().find(|(arg, _)| *arg == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[open..open + close + 2]),
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

/// Built-in English templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCatalog;

impl DefaultCatalog {
    fn lookup(key: &str) -> Option<&'static str> {
        Some(match key {
            INVALID_CELL => "Row {row}, column \"{title}\": ",
            INVALID_CELL_NUMBERED => "Row {row}, column {column}: ",
            INVALID_ROW => "Row {row} has {count} invalid cell(s)",
            "validation.notnull" => "a value is required",
            "validation.length" => "must be at most {length} characters",
            "validation.integer_range" => "must be a whole number between {min} and {max}",
            "validation.decimal_range" => "must be a number between {min} and {max}",
            "validation.fixed_precision" => "must have at most {digits} decimal places",
            "validation.pattern" => "does not match the pattern {pattern}",
            "validation.picklist" => "must be one of {range}",
            "validation.readonly" => "must stay \"{value}\"",
            "validation.unique" => "duplicates an earlier row",
            _ => return None,
        })
    }
}

impl MessageCatalog for DefaultCatalog {
    fn template(&self, key: &str, _locale: Option<&str>) -> Option<Cow<'_, str>> {
        Self::lookup(key).map(Cow::Borrowed)
    }
}

/// Templates keyed by locale, then message key.
///
/// Lookup tries the exact locale, its language part, the `default` table and
/// finally the built-in English templates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapCatalog {
    #[serde(default)]
    default: BTreeMap<String, String>,
    #[serde(default)]
    locales: BTreeMap<String, BTreeMap<String, String>>,
}

impl MapCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::with_normalized_locales)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str::<Self>(yaml).map(Self::with_normalized_locales)
    }

    fn with_normalized_locales(mut self) -> Self {
        self.locales = std::mem::take(&mut self.locales)
            .into_iter()
            .map(|(locale, table)| (normalize_locale(&locale), table))
            .collect();
        self
    }

    pub fn insert(
        &mut self,
        locale: Option<&str>,
        key: impl Into<String>,
        template: impl Into<String>,
    ) -> &mut Self {
        let table = match locale {
            Some(locale) => self.locales.entry(normalize_locale(locale)).or_default(),
            None => &mut self.default,
        };
        table.insert(key.into(), template.into());
        self
    }

    fn locale_table(&self, locale: &str) -> Option<&BTreeMap<String, String>> {
        self.locales.get(&normalize_locale(locale))
    }
}

impl MessageCatalog for MapCatalog {
    fn template(&self, key: &str, locale: Option<&str>) -> Option<Cow<'_, str>> {
        if let Some(locale) = locale {
            let normalized = normalize_locale(locale);
            if let Some(found) = self.locale_table(&normalized).and_then(|t| t.get(key)) {
                return Some(Cow::Borrowed(found.as_str()));
            }
            let language = normalized.split('-').next().unwrap_or_default();
            if let Some(found) = self.locale_table(language).and_then(|t| t.get(key)) {
                return Some(Cow::Borrowed(found.as_str()));
            }
        }
        self.default
            .get(key)
            .map(|t| Cow::Borrowed(t.as_str()))
            .or_else(|| DefaultCatalog::lookup(key).map(Cow::Borrowed))
    }
}

fn normalize_locale(locale: &str) -> String {
    locale.trim().replace('_', "-").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_every_occurrence() {
        let out = interpolate(
            "{a} and {a} then {b}",
            &[("a", "x".to_string()), ("b", "y".to_string())],
        );
        assert_eq!(out, "x and x then y");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let out = interpolate(
            "between {min} and {max}",
            &[("min", "{max}".to_string()), ("max", "9".to_string())],
        );
        assert_eq!(out, "between {max} and 9");
        assert_eq!(interpolate("{other} {", &[("a", "x".to_string())]), "{other} {");

        let rule = crate::constraint::ColumnConstraint::ReadOnly {
            value: "{row}".to_string(),
        };
        let mut args = vec![("row", "3".to_string())];
        args.extend(rule.message_args());
        assert_eq!(
            interpolate("row {row} must stay {value}", &args),
            "row 3 must stay {row}"
        );
    }

    #[test]
    fn unknown_key_renders_as_key() {
        assert_eq!(DefaultCatalog.render("no.such.key", None, &[]), "no.such.key");
    }

    #[test]
    fn map_catalog_falls_back_by_language_then_default() {
        let catalog = MapCatalog::from_yaml_str(
            r#"
default:
  validation.unique: "already used"
locales:
  FR:
    validation.notnull: "valeur obligatoire"
"#,
        )
        .expect("catalog parses");

        assert_eq!(
            catalog.render("validation.notnull", Some("fr_CA"), &[]),
            "valeur obligatoire"
        );
        assert_eq!(
            catalog.render("validation.unique", Some("fr"), &[]),
            "already used"
        );
        assert_eq!(
            catalog.render("validation.length", Some("de"), &[("length", "3".into())]),
            "must be at most 3 characters"
        );
    }

    #[test]
    fn insert_normalizes_locale() {
        let mut catalog = MapCatalog::new();
        catalog.insert(Some("en_GB"), "validation.unique", "taken");
        assert_eq!(
            catalog.template("validation.unique", Some("en-gb")).as_deref(),
            Some("taken")
        );
    }
}
