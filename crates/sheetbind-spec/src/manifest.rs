use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use semver::Version;
use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sheetbind_common::letters_to_col;

use crate::validation::{ManifestIssue, ValidationError};

/// Current supported manifest specification version.
pub const CURRENT_SPEC_VERSION: &str = "0.2.0";
/// Constant identifier for this spec.
pub const SPEC_IDENT: &str = "sheetbind";

static MANIFEST_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9-]{1,62}[a-z0-9]$").expect("manifest id regex must compile")
});
static COLUMN_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").expect("column key regex must compile")
});

/// Canonical manifest representation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[schemars(
    title = "sheetbind column manifest",
    description = "Binds spreadsheet columns to typed record fields together with per-column validation rules."
)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Identifier for this specification (must be `sheetbind`).
    pub spec: String,
    #[serde(rename = "spec_version")]
    pub spec_version: SpecVersion,
    /// Human-facing metadata describing the manifest.
    pub manifest: ManifestMeta,
    /// Column definitions.
    pub columns: Vec<ColumnSpec>,
}

impl Manifest {
    /// Construct a manifest by reading YAML from any reader.
    pub fn from_yaml_reader<R: std::io::Read>(reader: R) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_reader(reader)
    }

    /// Construct a manifest from a YAML string slice.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Construct a manifest from a JSON string slice.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize this manifest to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Look up a column by key.
    pub fn column(&self, key: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// Normalize the manifest in-place for deterministic comparison.
    ///
    /// - Columns are sorted by position; columns without one go last.
    /// - Tags are sorted and deduplicated.
    /// - Pick-list values are deduplicated, keeping first occurrences in place
    ///   since their order is the order shown to users.
    pub fn normalize(&mut self) {
        if let Some(tags) = &mut self.manifest.tags {
            tags.sort();
            tags.dedup();
        }

        self.columns
            .sort_by_key(|c| c.position().map_or((1, 0), |p| (0, p)));

        for column in &mut self.columns {
            if let Some(picklist) = column
                .constraints
                .as_mut()
                .and_then(|c| c.picklist.as_mut())
            {
                let mut seen = HashSet::new();
                picklist.values.retain(|v| seen.insert(v.clone()));
            }
        }
    }

    /// Return a normalized copy of the manifest.
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Validate the manifest and return granular issues when invariants fail.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.spec != SPEC_IDENT {
            issues.push(ManifestIssue::new(
                "spec",
                format!("expected spec identifier `{SPEC_IDENT}`, found `{}`", self.spec),
            ));
        }

        let current_version = Version::parse(CURRENT_SPEC_VERSION)
            .expect("CURRENT_SPEC_VERSION must be valid semver");
        let spec_version = &self.spec_version.0;
        if spec_version.major != current_version.major
            || (current_version.major == 0 && spec_version.minor != current_version.minor)
        {
            issues.push(ManifestIssue::new(
                "spec_version",
                format!(
                    "incompatible version `{spec_version}` (expected {}.{}.x)",
                    current_version.major, current_version.minor
                ),
            ));
        }

        if !MANIFEST_ID.is_match(&self.manifest.id) {
            issues.push(ManifestIssue::new(
                "manifest.id",
                "id must be lowercase alphanumeric with hyphens, 3-64 chars",
            ));
        }

        if self.columns.is_empty() {
            issues.push(ManifestIssue::new(
                "columns",
                "manifest must define at least one column",
            ));
        }

        let mut seen_keys = HashSet::new();
        let mut seen_positions: HashMap<u32, &str> = HashMap::new();

        for (idx, column) in self.columns.iter().enumerate() {
            let base = format!("columns[{idx}]");

            if !COLUMN_KEY.is_match(&column.key) {
                issues.push(ManifestIssue::new(
                    format!("{base}.key"),
                    "key must start with a letter or '_' and contain only alphanumerics, '_' or '.'",
                ));
            }
            if !seen_keys.insert(column.key.as_str()) {
                issues.push(ManifestIssue::new(
                    format!("{base}.key"),
                    format!("duplicate column key `{}`", column.key),
                ));
            }

            match (&column.col, column.index) {
                (Some(_), Some(_)) => issues.push(ManifestIssue::new(
                    base.clone(),
                    "specify either `col` or `index`, not both",
                )),
                (None, None) => issues.push(ManifestIssue::new(
                    base.clone(),
                    "column position is required (`col` or `index`)",
                )),
                (Some(letters), None) if column.position().is_none() => {
                    issues.push(ManifestIssue::new(
                        format!("{base}.col"),
                        format!("`{letters}` is not a column letter"),
                    ))
                }
                _ => {}
            }
            if let Some(position) = column.position() {
                if let Some(previous) = seen_positions.insert(position, column.key.as_str()) {
                    issues.push(ManifestIssue::new(
                        base.clone(),
                        format!(
                            "column position {} is already used by `{previous}`",
                            position + 1
                        ),
                    ));
                }
            }

            let value_type = column.value_type;
            match (&column.enum_values, value_type) {
                (None, Some(ValueType::Enum)) => issues.push(ManifestIssue::new(
                    format!("{base}.enum_values"),
                    "enum columns must list their values",
                )),
                (Some(values), Some(ValueType::Enum)) if values.is_empty() => {
                    issues.push(ManifestIssue::new(
                        format!("{base}.enum_values"),
                        "enum columns must list at least one value",
                    ))
                }
                (Some(_), ty) if ty != Some(ValueType::Enum) => issues.push(ManifestIssue::new(
                    format!("{base}.enum_values"),
                    "enum_values is only valid with `type: enum`",
                )),
                _ => {}
            }

            if let Some(constraints) = &column.constraints {
                validate_constraints(&base, constraints, &mut issues);
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(issues))
        }
    }
}

fn validate_constraints(base: &str, constraints: &ConstraintSpec, issues: &mut Vec<ManifestIssue>) {
    if let Some(pattern) = &constraints.pattern {
        if let Err(err) = Regex::new(pattern) {
            issues.push(ManifestIssue::new(
                format!("{base}.constraints.pattern"),
                format!("pattern does not compile: {err}"),
            ));
        }
    }
    if let (Some(min), Some(max)) = (constraints.min, constraints.max) {
        if min > max {
            issues.push(ManifestIssue::new(
                format!("{base}.constraints"),
                format!("min ({min}) is greater than max ({max})"),
            ));
        }
    }
    if let (Some(min), Some(max)) = (constraints.decimal_min, constraints.decimal_max) {
        if min > max {
            issues.push(ManifestIssue::new(
                format!("{base}.constraints"),
                format!("decimal_min ({min}) is greater than decimal_max ({max})"),
            ));
        }
    }
    if constraints.max_length == Some(0) {
        issues.push(ManifestIssue::new(
            format!("{base}.constraints.max_length"),
            "max_length must be positive",
        ));
    }
    if let Some(picklist) = &constraints.picklist {
        if picklist.values.is_empty() {
            issues.push(ManifestIssue::new(
                format!("{base}.constraints.picklist.values"),
                "pick list must contain at least one value",
            ));
        }
    }
}

/// Manifest metadata block.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ManifestMeta {
    /// Stable identifier for the manifest (lowercase alphanumeric + hyphen).
    pub id: String,
    /// Human readable manifest name.
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Sheet the columns live on, when the manifest is tied to one.
    #[serde(default)]
    pub sheet: Option<String>,
    /// Default locale used to pick column titles.
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, JsonValue>>,
}

/// One column binding.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ColumnSpec {
    /// Key used in map records and typed bindings.
    pub key: String,
    #[serde(default)]
    /// Column letter (`A`, `B`, ..., `AA`).
    pub col: Option<String>,
    #[serde(default)]
    /// Zero-based column index; alternative to `col`.
    pub index: Option<u32>,
    #[serde(default)]
    /// Header title.
    pub title: Option<String>,
    #[serde(default)]
    /// Per-locale header titles, keyed by locale tag (`en`, `en-US`, `fr_FR`).
    pub titles: Option<BTreeMap<String, String>>,
    #[serde(default)]
    /// Optional sub-header label.
    pub label: Option<String>,
    #[serde(default, rename = "type")]
    /// Target type; omitted columns are read as raw values.
    pub value_type: Option<ValueType>,
    #[serde(default)]
    /// Constants of an `enum` column.
    pub enum_values: Option<Vec<EnumValueSpec>>,
    #[serde(default)]
    /// Formatting tag (`INTEGER`, `DOUBLE`, `DATE`, `PERCENT`, `PICKLIST`, ...).
    pub raw_type: Option<String>,
    #[serde(default = "default_true")]
    pub writable: bool,
    #[serde(default = "default_true")]
    /// Hidden when false.
    pub display: bool,
    #[serde(default)]
    /// Character width hint.
    pub length: Option<u32>,
    #[serde(default)]
    /// Example value for template rows.
    pub sample: Option<String>,
    #[serde(default)]
    pub constraints: Option<ConstraintSpec>,
}

fn default_true() -> bool {
    true
}

impl ColumnSpec {
    /// Zero-based position from `index` or `col`.
    pub fn position(&self) -> Option<u32> {
        match (&self.col, self.index) {
            (_, Some(index)) => Some(index),
            (Some(letters), None) => letters_to_col(&letters.trim().to_ascii_uppercase()),
            (None, None) => None,
        }
    }

    /// Title for `locale`: exact locale match, then language match, then
    /// `title`, then the key.
    pub fn title_for(&self, locale: Option<&str>) -> String {
        if let (Some(titles), Some(locale)) = (&self.titles, locale) {
            let wanted = normalize_locale(locale);
            let language = wanted.split('-').next().unwrap_or_default().to_string();
            let exact = titles.iter().find(|(tag, _)| normalize_locale(tag) == wanted);
            let by_language = || {
                titles
                    .iter()
                    .find(|(tag, _)| {
                        normalize_locale(tag).split('-').next() == Some(language.as_str())
                    })
            };
            if let Some((_, title)) = exact.or_else(by_language) {
                return title.clone();
            }
        }
        self.title.clone().unwrap_or_else(|| self.key.clone())
    }
}

fn normalize_locale(tag: &str) -> String {
    tag.trim().replace('_', "-").to_ascii_lowercase()
}

/// Target value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Boolean,
    Integer,
    Long,
    Float,
    Double,
    Decimal,
    Date,
    Datetime,
    Time,
    Enum,
}

/// One constant of an `enum` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EnumValueSpec {
    /// Constant name.
    pub name: String,
    #[serde(default)]
    /// Custom text matched instead of the name.
    pub value: Option<String>,
}

/// Rules applied to one column.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ConstraintSpec {
    #[serde(default)]
    /// Blank values are rejected.
    pub required: bool,
    #[serde(default)]
    /// Values must not repeat within one read pass.
    pub unique: bool,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    /// Inclusive integer lower bound.
    pub min: Option<i64>,
    #[serde(default)]
    /// Inclusive integer upper bound.
    pub max: Option<i64>,
    #[serde(default)]
    pub decimal_min: Option<f64>,
    #[serde(default)]
    pub decimal_max: Option<f64>,
    #[serde(default)]
    /// Maximum significant fractional digits.
    pub precision: Option<u32>,
    #[serde(default)]
    /// Regular expression the whole value must match.
    pub pattern: Option<String>,
    #[serde(default)]
    pub picklist: Option<PickListSpec>,
    #[serde(default)]
    /// Only this exact value is accepted.
    pub fixed_value: Option<String>,
}

/// Enumerated permitted values.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PickListSpec {
    pub values: Vec<String>,
    #[serde(default)]
    /// Accept comma-separated lists of entries.
    pub allow_multiple: bool,
    #[serde(default = "default_true")]
    /// When false the list is only a suggestion.
    pub must_be_in_range: bool,
}

/// Wrapper around semver::Version for serde compatibility.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SpecVersion(pub Version);

impl SpecVersion {
    pub fn new(version: Version) -> Self {
        Self(version)
    }

    pub fn current() -> Self {
        Self(Version::parse(CURRENT_SPEC_VERSION).expect("CURRENT_SPEC_VERSION must be valid semver"))
    }
}

impl Serialize for SpecVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for SpecVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct VersionVisitor;

        impl<'de> Visitor<'de> for VersionVisitor {
            type Value = SpecVersion;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("semantic version string (e.g. 0.2.0)")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Version::parse(v)
                    .map(SpecVersion)
                    .map_err(|err| de::Error::custom(format!("invalid spec_version: {err}")))
            }
        }

        deserializer.deserialize_str(VersionVisitor)
    }
}

impl JsonSchema for SpecVersion {
    fn schema_name() -> Cow<'static, str> {
        "SpecVersion".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "string",
            "pattern": r"^[0-9]+\.[0-9]+\.[0-9]+(?:-[0-9A-Za-z-.]+)?(?:\+[0-9A-Za-z-.]+)?$"
        })
    }
}

impl std::str::FromStr for Manifest {
    type Err = serde_yaml::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Manifest::from_yaml_str(s)
    }
}
