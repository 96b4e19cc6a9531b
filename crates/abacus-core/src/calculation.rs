//! Completed calculation records
//!
//! A [`Calculation`] is immutable once the engine has built it. Its flat
//! form, [`CalculationRecord`], renders every decimal as exact text so a
//! record survives a trip through the history file without precision loss.

use crate::error::{CalculatorError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column names of the flat record form, in file order
pub const COLUMNS: [&str; 5] = ["operation", "operand1", "operand2", "result", "timestamp"];

/// One completed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calculation {
    operation: String,
    operand1: Decimal,
    operand2: Decimal,
    result: Decimal,
    timestamp: DateTime<Utc>,
}

/// Flat, string-valued form of a [`Calculation`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationRecord {
    pub operation: String,
    pub operand1: String,
    pub operand2: String,
    pub result: String,
    pub timestamp: String,
}

impl Calculation {
    pub(crate) fn new(
        operation: impl Into<String>,
        operand1: Decimal,
        operand2: Decimal,
        result: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self { operation: operation.into(), operand1, operand2, result, timestamp }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn operand1(&self) -> Decimal {
        self.operand1
    }

    pub fn operand2(&self) -> Decimal {
        self.operand2
    }

    pub fn result(&self) -> Decimal {
        self.result
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Flat record with exact text for every field
    pub fn to_record(&self) -> CalculationRecord {
        CalculationRecord {
            operation: self.operation.clone(),
            operand1: self.operand1.to_string(),
            operand2: self.operand2.to_string(),
            result: self.result.to_string(),
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, false),
        }
    }

    /// Rebuilds a calculation from its flat record
    pub fn from_record(record: &CalculationRecord) -> Result<Self> {
        Ok(Self {
            operation: record.operation.clone(),
            operand1: parse_decimal("operand1", &record.operand1)?,
            operand2: parse_decimal("operand2", &record.operand2)?,
            result: parse_decimal("result", &record.result)?,
            timestamp: parse_timestamp(&record.timestamp)?,
        })
    }

    /// String-keyed mapping keyed by [`COLUMNS`]
    pub fn to_mapping(&self) -> BTreeMap<String, String> {
        let record = self.to_record();
        [
            record.operation,
            record.operand1,
            record.operand2,
            record.result,
            record.timestamp,
        ]
        .into_iter()
        .zip(COLUMNS)
        .map(|(value, key)| (key.to_string(), value))
        .collect()
    }

    /// Rebuilds a calculation from a mapping produced by [`Calculation::to_mapping`]
    pub fn from_mapping(mapping: &BTreeMap<String, String>) -> Result<Self> {
        let field = |key: &str| {
            mapping
                .get(key)
                .cloned()
                .ok_or_else(|| CalculatorError::malformed_record(format!("missing field '{key}'")))
        };
        Self::from_record(&CalculationRecord {
            operation: field("operation")?,
            operand1: field("operand1")?,
            operand2: field("operand2")?,
            result: field("result")?,
            timestamp: field("timestamp")?,
        })
    }
}

fn parse_decimal(field: &str, text: &str) -> Result<Decimal> {
    Decimal::from_str_exact(text.trim()).map_err(|e| {
        CalculatorError::malformed_record(format!("invalid decimal in '{field}': '{text}' ({e})"))
    })
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            CalculatorError::malformed_record(format!("invalid timestamp '{text}' ({e})"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sample() -> Calculation {
        Calculation::new(
            "divide",
            dec!(6.000000),
            dec!(2),
            dec!(3.000000),
            Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap()
                + chrono::Duration::nanoseconds(535_897_932),
        )
    }

    #[test]
    fn test_record_keeps_exact_decimal_text() {
        let record = sample().to_record();
        assert_eq!(record.operand1, "6.000000");
        assert_eq!(record.result, "3.000000");
        assert_eq!(record.timestamp, "2025-03-14T15:09:26.535897932+00:00");
    }

    #[test]
    fn test_mapping_round_trip() {
        let calc = sample();
        let mapping = calc.to_mapping();
        assert_eq!(mapping.len(), COLUMNS.len());
        assert_eq!(mapping["operation"], "divide");
        let restored = Calculation::from_mapping(&mapping).unwrap();
        assert_eq!(restored, calc);
        assert_eq!(restored.result().to_string(), "3.000000");
    }

    #[test]
    fn test_from_mapping_missing_field() {
        let mut mapping = sample().to_mapping();
        mapping.remove("result");
        let err = Calculation::from_mapping(&mapping).unwrap_err();
        assert!(err.to_string().contains("missing field 'result'"));
    }

    #[test]
    fn test_from_record_rejects_bad_values() {
        let mut record = sample().to_record();
        record.operand2 = "two".to_string();
        assert!(Calculation::from_record(&record).is_err());

        let mut record = sample().to_record();
        record.timestamp = "yesterday".to_string();
        assert!(Calculation::from_record(&record).is_err());
    }

    #[test]
    fn test_timestamp_with_offset_is_normalised_to_utc() {
        let mut record = sample().to_record();
        record.timestamp = "2025-03-14T17:09:26+02:00".to_string();
        let calc = Calculation::from_record(&record).unwrap();
        assert_eq!(calc.timestamp(), Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap());
    }

    proptest::proptest! {
        #[test]
        fn prop_mapping_round_trip(
            mantissa1 in proptest::num::i64::ANY,
            mantissa2 in proptest::num::i64::ANY,
            mantissa3 in proptest::num::i64::ANY,
            scale in 0u32..=18,
            seconds in 0i64..4_102_444_800,
            nanos in 0u32..1_000_000_000,
        ) {
            let calc = Calculation::new(
                "multiply",
                Decimal::new(mantissa1, scale),
                Decimal::new(mantissa2, scale),
                Decimal::new(mantissa3, scale),
                DateTime::from_timestamp(seconds, nanos).unwrap(),
            );
            let restored = Calculation::from_mapping(&calc.to_mapping()).unwrap();
            proptest::prop_assert_eq!(&restored, &calc);
            proptest::prop_assert_eq!(restored.result().scale(), calc.result().scale());
        }
    }
}
