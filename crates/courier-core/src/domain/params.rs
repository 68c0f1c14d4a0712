//! TaskParams - パラメータバッグの型付きビュー
//!
//! ワーカーに届くパラメータは文字列キーの multi-valued map。
//! 型付きアクセサは最初の値だけを読む。
//!
//! - キーなし / 空文字列 → `Ok(None)`
//! - 値はあるがパースできない → `CourierError::Format`
//!
//! # 使用例
//!
//! ```ignore
//! let params = TaskParams::builder()
//!     .add_int("count", 3)
//!     .add_date("due", NaiveDate::from_ymd_opt(2024, 1, 31))
//!     .build();
//!
//! assert_eq!(params.get_int("count")?, Some(3));
//! assert_eq!(params.get_string("due"), Some("31-01-2024"));
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

use crate::domain::errors::{CourierError, CourierResult};

/// Date-only wire format (`dd-MM-yyyy`).
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Date + time wire format (`dd-MM-yyyy HH:mm`).
pub const DATE_TIME_FORMAT: &str = "%d-%m-%Y %H:%M";

/// Flat, string-keyed, multi-valued parameter map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamBag(HashMap<String, Vec<String>>);

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// Replaces all values under `key`.
    pub fn set(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.0.insert(key.into(), values);
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<HashMap<String, Vec<String>>> for ParamBag {
    fn from(map: HashMap<String, Vec<String>>) -> Self {
        Self(map)
    }
}

impl From<&BTreeMap<String, String>> for ParamBag {
    fn from(map: &BTreeMap<String, String>) -> Self {
        map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParamBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = ParamBag::new();
        for (k, v) in iter {
            bag.insert(k, v);
        }
        bag
    }
}

/// Pluggable formatter for one value type.
///
/// A fresh instance is constructed for every call; nothing is cached.
pub trait ParamFormat: Sized {
    type Value;

    fn create() -> Result<Self, String>;

    fn parse(&self, raw: &str) -> Result<Self::Value, String>;

    fn format(&self, value: &Self::Value) -> Result<String, String>;
}

/// `dd-MM-yyyy`
#[derive(Debug, Clone, Copy, Default)]
pub struct DateFormat;

impl ParamFormat for DateFormat {
    type Value = NaiveDate;

    fn create() -> Result<Self, String> {
        Ok(Self)
    }

    fn parse(&self, raw: &str) -> Result<NaiveDate, String> {
        NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| e.to_string())
    }

    fn format(&self, value: &NaiveDate) -> Result<String, String> {
        Ok(value.format(DATE_FORMAT).to_string())
    }
}

/// `dd-MM-yyyy HH:mm`
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeFormat;

impl ParamFormat for DateTimeFormat {
    type Value = NaiveDateTime;

    fn create() -> Result<Self, String> {
        Ok(Self)
    }

    fn parse(&self, raw: &str) -> Result<NaiveDateTime, String> {
        NaiveDateTime::parse_from_str(raw, DATE_TIME_FORMAT).map_err(|e| e.to_string())
    }

    fn format(&self, value: &NaiveDateTime) -> Result<String, String> {
        Ok(value.format(DATE_TIME_FORMAT).to_string())
    }
}

/// Formats `value` through a freshly constructed `F`.
pub fn format_with<F: ParamFormat>(value: &F::Value) -> CourierResult<String> {
    let formatter = F::create().map_err(CourierError::Configuration)?;
    formatter.format(value).map_err(CourierError::Configuration)
}

/// Read-only typed view over a [`ParamBag`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskParams {
    bag: ParamBag,
}

impl TaskParams {
    pub fn new(bag: ParamBag) -> Self {
        Self { bag }
    }

    pub fn builder() -> TaskParamsBuilder {
        TaskParamsBuilder::default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.bag.contains_key(key)
    }

    /// Every value under `key` (empty slice when missing).
    pub fn values(&self, key: &str) -> &[String] {
        self.bag.all(key)
    }

    pub fn len(&self) -> usize {
        self.bag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bag.is_empty()
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.bag.first(key)
    }

    pub fn get_int(&self, key: &str) -> CourierResult<Option<i32>> {
        self.parse_with(key, str::parse::<i32>)
    }

    pub fn get_long(&self, key: &str) -> CourierResult<Option<i64>> {
        self.parse_with(key, str::parse::<i64>)
    }

    pub fn get_double(&self, key: &str) -> CourierResult<Option<f64>> {
        self.parse_with(key, str::parse::<f64>)
    }

    pub fn get_date(&self, key: &str) -> CourierResult<Option<NaiveDate>> {
        self.format::<DateFormat>(key)
    }

    pub fn get_date_time(&self, key: &str) -> CourierResult<Option<NaiveDateTime>> {
        self.format::<DateTimeFormat>(key)
    }

    /// Parses through a caller-chosen [`ParamFormat`].
    pub fn format<F: ParamFormat>(&self, key: &str) -> CourierResult<Option<F::Value>> {
        let Some(raw) = self.non_empty(key) else {
            return Ok(None);
        };
        let formatter = F::create().map_err(CourierError::Configuration)?;
        formatter
            .parse(raw)
            .map(Some)
            .map_err(|reason| CourierError::format(key, raw, reason))
    }

    pub fn as_bag(&self) -> &ParamBag {
        &self.bag
    }

    fn non_empty(&self, key: &str) -> Option<&str> {
        self.get_string(key).filter(|v| !v.is_empty())
    }

    fn parse_with<T, E: Display>(
        &self,
        key: &str,
        parse: impl FnOnce(&str) -> Result<T, E>,
    ) -> CourierResult<Option<T>> {
        match self.non_empty(key) {
            None => Ok(None),
            Some(raw) => parse(raw)
                .map(Some)
                .map_err(|e| CourierError::format(key, raw, e)),
        }
    }
}

impl From<ParamBag> for TaskParams {
    fn from(bag: ParamBag) -> Self {
        Self::new(bag)
    }
}

/// Builder for [`TaskParams`]. `None` values are skipped.
#[derive(Debug, Default)]
pub struct TaskParamsBuilder {
    bag: ParamBag,
}

impl TaskParamsBuilder {
    pub fn add_string(mut self, key: &str, value: impl Into<String>) -> Self {
        self.bag.insert(key, value);
        self
    }

    pub fn add_int(self, key: &str, value: impl Into<Option<i32>>) -> Self {
        self.add_display(key, value.into())
    }

    pub fn add_long(self, key: &str, value: impl Into<Option<i64>>) -> Self {
        self.add_display(key, value.into())
    }

    pub fn add_double(self, key: &str, value: impl Into<Option<f64>>) -> Self {
        self.add_display(key, value.into())
    }

    pub fn add_date(self, key: &str, value: impl Into<Option<NaiveDate>>) -> Self {
        let formatted = value.into().map(|d| d.format(DATE_FORMAT).to_string());
        self.add_display(key, formatted)
    }

    pub fn add_date_time(self, key: &str, value: impl Into<Option<NaiveDateTime>>) -> Self {
        let formatted = value.into().map(|d| d.format(DATE_TIME_FORMAT).to_string());
        self.add_display(key, formatted)
    }

    pub fn build(self) -> TaskParams {
        TaskParams::new(self.bag)
    }

    fn add_display<T: Display>(mut self, key: &str, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.bag.insert(key, value.to_string());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn params(pairs: &[(&str, &str)]) -> TaskParams {
        TaskParams::new(pairs.iter().copied().collect())
    }

    #[test]
    fn missing_key_is_none_for_every_accessor() {
        let p = TaskParams::default();
        assert_eq!(p.get_string("x"), None);
        assert_eq!(p.get_int("x").unwrap(), None);
        assert_eq!(p.get_long("x").unwrap(), None);
        assert_eq!(p.get_double("x").unwrap(), None);
        assert_eq!(p.get_date("x").unwrap(), None);
        assert_eq!(p.get_date_time("x").unwrap(), None);
    }

    #[test]
    fn empty_value_is_none_for_typed_accessors() {
        let p = params(&[("n", "")]);
        assert_eq!(p.get_string("n"), Some(""));
        assert_eq!(p.get_int("n").unwrap(), None);
        assert_eq!(p.get_date("n").unwrap(), None);
    }

    #[rstest]
    #[case::letters("abc")]
    #[case::fraction("1.5")]
    #[case::overflow("99999999999")]
    fn malformed_int_is_format_error(#[case] raw: &str) {
        let err = params(&[("n", raw)]).get_int("n").unwrap_err();
        match err {
            CourierError::Format { key, value, .. } => {
                assert_eq!(key, "n");
                assert_eq!(value, raw);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parses_numbers() {
        let p = params(&[("i", "-42"), ("l", "9000000000"), ("d", "2.5")]);
        assert_eq!(p.get_int("i").unwrap(), Some(-42));
        assert_eq!(p.get_long("l").unwrap(), Some(9_000_000_000));
        assert_eq!(p.get_double("d").unwrap(), Some(2.5));
    }

    #[test]
    fn only_first_value_is_read() {
        let mut bag = ParamBag::new();
        bag.insert("n", "1");
        bag.insert("n", "2");
        let p = TaskParams::new(bag);
        assert_eq!(p.get_int("n").unwrap(), Some(1));
        assert_eq!(p.values("n"), ["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn dates_use_day_first_formats() {
        let p = params(&[("d", "31-01-2024"), ("dt", "31-01-2024 13:45")]);
        assert_eq!(
            p.get_date("d").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31)
        );
        let dt = p.get_date_time("dt").unwrap().unwrap();
        assert_eq!(dt.to_string(), "2024-01-31 13:45:00");

        // ISO 形式は受け付けない
        assert!(params(&[("d", "2024-01-31")]).get_date("d").is_err());
    }

    struct BrokenFormat;

    impl ParamFormat for BrokenFormat {
        type Value = String;

        fn create() -> Result<Self, String> {
            Err("no default constructor".into())
        }

        fn parse(&self, raw: &str) -> Result<String, String> {
            Ok(raw.to_string())
        }

        fn format(&self, value: &String) -> Result<String, String> {
            Ok(value.clone())
        }
    }

    #[test]
    fn formatter_construction_failure_is_configuration_error() {
        let err = params(&[("x", "v")]).format::<BrokenFormat>("x").unwrap_err();
        assert!(matches!(err, CourierError::Configuration(_)));

        let err = format_with::<BrokenFormat>(&"v".to_string()).unwrap_err();
        assert!(matches!(err, CourierError::Configuration(_)));
    }

    #[test]
    fn formatter_is_not_constructed_for_missing_values() {
        let p = TaskParams::default();
        assert_eq!(p.format::<BrokenFormat>("x").unwrap(), None);
    }

    #[test]
    fn builder_skips_none_values() {
        let p = TaskParams::builder()
            .add_string("s", "hello")
            .add_int("i", 7)
            .add_long("l", None)
            .add_double("d", Some(0.5))
            .add_date("day", NaiveDate::from_ymd_opt(2024, 2, 1))
            .build();

        assert_eq!(p.get_string("s"), Some("hello"));
        assert_eq!(p.get_int("i").unwrap(), Some(7));
        assert!(!p.contains_key("l"));
        assert_eq!(p.get_double("d").unwrap(), Some(0.5));
        assert_eq!(p.get_string("day"), Some("01-02-2024"));
        assert_eq!(p.len(), 4);
    }
}
