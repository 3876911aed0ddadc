use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Parses date/time text found in cells and renders typed dates back to text.
pub trait DateTimeCodec: Send + Sync {
    fn parse_date(&self, text: &str) -> Option<NaiveDate>;
    fn parse_datetime(&self, text: &str) -> Option<NaiveDateTime>;
    fn parse_time(&self, text: &str) -> Option<NaiveTime>;

    fn format_date(&self, date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    fn format_datetime(&self, datetime: &NaiveDateTime) -> String {
        datetime.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn format_time(&self, time: &NaiveTime) -> String {
        time.format("%H:%M:%S").to_string()
    }
}

/// Tries a list of `chrono` format patterns in order.
#[derive(Debug, Clone)]
pub struct PatternDateTimeCodec {
    date_patterns: Vec<String>,
    datetime_patterns: Vec<String>,
    time_patterns: Vec<String>,
}

impl Default for PatternDateTimeCodec {
    fn default() -> Self {
        Self {
            date_patterns: to_owned(&["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"]),
            datetime_patterns: to_owned(&[
                "%Y-%m-%d %H:%M:%S",
                "%Y-%m-%dT%H:%M:%S",
                "%Y/%m/%d %H:%M:%S",
                "%Y-%m-%d %H:%M",
                "%m/%d/%Y %H:%M:%S",
            ]),
            time_patterns: to_owned(&["%H:%M:%S", "%H:%M"]),
        }
    }
}

fn to_owned(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}

impl PatternDateTimeCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a date pattern so it is tried first.
    pub fn with_date_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.date_patterns.insert(0, pattern.into());
        self
    }

    pub fn with_datetime_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.datetime_patterns.insert(0, pattern.into());
        self
    }

    pub fn with_time_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.time_patterns.insert(0, pattern.into());
        self
    }

    fn datetime_only(&self, text: &str) -> Option<NaiveDateTime> {
        self.datetime_patterns
            .iter()
            .find_map(|p| NaiveDateTime::parse_from_str(text, p).ok())
    }

    fn date_only(&self, text: &str) -> Option<NaiveDate> {
        self.date_patterns
            .iter()
            .find_map(|p| NaiveDate::parse_from_str(text, p).ok())
    }
}

impl DateTimeCodec for PatternDateTimeCodec {
    fn parse_date(&self, text: &str) -> Option<NaiveDate> {
        let text = text.trim();
        self.date_only(text)
            .or_else(|| self.datetime_only(text).map(|dt| dt.date()))
    }

    fn parse_datetime(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        self.datetime_only(text)
            .or_else(|| self.date_only(text).map(|d| d.and_time(NaiveTime::MIN)))
    }

    fn parse_time(&self, text: &str) -> Option<NaiveTime> {
        let text = text.trim();
        self.time_patterns
            .iter()
            .find_map(|p| NaiveTime::parse_from_str(text, p).ok())
            .or_else(|| self.datetime_only(text).map(|dt| dt.time()))
    }
}
