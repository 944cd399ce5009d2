//! Column value decoder
//!
//! Turns one raw cell of the current row into an owned [`Value`]. Decoding
//! must happen before the engine fetches the next row, because the cell
//! borrows the engine's shared row buffer.

use std::fmt;

use super::value::Value;
use crate::catalog::{ColumnDefinition, ColumnType};
use crate::engine::{Engine, RawCell};
use crate::error::{Error, Result};

/// A cell that failed to decode; the row keeps a NULL in its place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeWarning {
    pub row: usize,
    pub column: String,
    pub message: String,
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}, column {}: {}", self.row, self.column, self.message)
    }
}

/// Decode a cell of a column with known metadata.
///
/// `bound` is the text the engine bound for the same output column; text-like
/// types are taken from it rather than from the raw bytes.
pub fn decode<E: Engine>(
    engine: &E,
    column: &ColumnDefinition,
    cell: &RawCell<'_>,
    bound: Option<&str>,
) -> Result<Value> {
    let short = || Error::Decode(format!("{} value of {} bytes", column.column_type, cell.len()));

    let value = match column.column_type {
        // Booleans are never null: the engine transfers a set bit as zero length
        ColumnType::Bool => Value::Bool(cell.is_empty()),
        _ if cell.is_null() => Value::Null,
        ColumnType::Byte => Value::Int64(cell.get_u8(0).ok_or_else(short)? as i64),
        ColumnType::Int16 => Value::Int64(cell.get_i16(0).ok_or_else(short)? as i64),
        ColumnType::Int32 => Value::Int64(cell.get_i32(0).ok_or_else(short)? as i64),
        ColumnType::Float32 => Value::Float64(widen_single(cell.get_f32(0).ok_or_else(short)?)?),
        ColumnType::Float64 => Value::Float64(cell.get_f64(0).ok_or_else(short)?),
        ColumnType::Money | ColumnType::Numeric => Value::Float64(parse_bound_number(bound)?),
        ColumnType::DateTime => {
            let days = cell.get_f64(0).ok_or_else(short)?;
            let datetime = engine
                .date_from_days(days)
                .ok_or_else(|| Error::Decode(format!("day count {} is out of range", days)))?;
            if column.is_short_date() {
                Value::Date(datetime.date())
            } else {
                Value::DateTime(datetime)
            }
        }
        ColumnType::OleBlob => {
            if cell.get_u32(0).ok_or_else(short)? == 0 {
                Value::Null
            } else {
                let buffer = engine
                    .read_ole(column, cell)
                    .map_err(|err| Error::Decode(err.message))?;
                Value::Blob(buffer.into_bytes())
            }
        }
        ColumnType::Binary => Value::Blob(cell.bytes().ok_or_else(short)?.to_vec()),
        ColumnType::Text
        | ColumnType::Memo
        | ColumnType::RepId
        | ColumnType::Complex
        | ColumnType::Unknown => decode_text(bound)?,
    };
    Ok(value)
}

/// Decode an output column from its bound text alone
pub fn decode_text(bound: Option<&str>) -> Result<Value> {
    bound
        .map(|text| Value::Text(text.to_string()))
        .ok_or_else(|| Error::Decode("engine bound no value".to_string()))
}

/// Widen a single to the double with the same shortest decimal form, so 1.1
/// stays 1.1 rather than 1.100000023841858
fn widen_single(value: f32) -> Result<f64> {
    if !value.is_finite() {
        return Ok(value as f64);
    }
    value
        .to_string()
        .parse()
        .map_err(|_| Error::Decode(format!("cannot widen single {}", value)))
}

fn parse_bound_number(bound: Option<&str>) -> Result<f64> {
    let text = bound.ok_or_else(|| Error::Decode("engine bound no value".to_string()))?;
    text.trim()
        .parse()
        .map_err(|_| Error::Decode(format!("'{}' is not a number", text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SHORT_DATE_FORMAT;
    use crate::engine::MemoryEngine;
    use byteorder::{ByteOrder, LittleEndian};
    use chrono::NaiveDate;

    fn engine() -> MemoryEngine {
        MemoryEngine::default()
    }

    fn column(column_type: ColumnType) -> ColumnDefinition {
        ColumnDefinition::new("C", column_type)
    }

    #[test]
    fn test_bool_polarity() {
        let buffer = [0u8];
        let set = RawCell::new(&buffer, 0, 0, false);
        let cleared = RawCell::new(&buffer, 0, 1, false);
        let col = column(ColumnType::Bool);
        assert_eq!(decode(&engine(), &col, &set, Some("1")).unwrap(), Value::Bool(true));
        assert_eq!(decode(&engine(), &col, &cleared, Some("0")).unwrap(), Value::Bool(false));
        // never null, even if flagged
        let flagged = RawCell::new(&buffer, 0, 0, true);
        assert_eq!(decode(&engine(), &col, &flagged, None).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_null_cells() {
        let buffer = [0u8; 8];
        let null = RawCell::new(&buffer, 0, 0, true);
        for column_type in [
            ColumnType::Byte,
            ColumnType::Int32,
            ColumnType::Float64,
            ColumnType::DateTime,
            ColumnType::OleBlob,
            ColumnType::Text,
            ColumnType::Unknown,
        ] {
            let value = decode(&engine(), &column(column_type), &null, Some("")).unwrap();
            assert_eq!(value, Value::Null, "{}", column_type);
        }
    }

    #[test]
    fn test_integers_and_floats() {
        let mut buffer = [0u8; 8];
        LittleEndian::write_i32(&mut buffer[0..4], -5);
        let cell = RawCell::new(&buffer, 0, 4, false);
        assert_eq!(decode(&engine(), &column(ColumnType::Int32), &cell, None).unwrap(), Value::Int64(-5));
        assert_eq!(decode(&engine(), &column(ColumnType::Int16), &cell, None).unwrap(), Value::Int64(-5));
        assert_eq!(decode(&engine(), &column(ColumnType::Byte), &cell, None).unwrap(), Value::Int64(251));

        LittleEndian::write_f64(&mut buffer, 2.5);
        let cell = RawCell::new(&buffer, 0, 8, false);
        assert_eq!(decode(&engine(), &column(ColumnType::Float64), &cell, None).unwrap(), Value::Float64(2.5));
        assert_eq!(
            decode(&engine(), &column(ColumnType::Money), &cell, Some("3.5000")).unwrap(),
            Value::Float64(3.5)
        );
    }

    #[test]
    fn test_single_keeps_decimal_form() {
        let mut buffer = [0u8; 4];
        LittleEndian::write_f32(&mut buffer, 1.1);
        let cell = RawCell::new(&buffer, 0, 4, false);
        let value = decode(&engine(), &column(ColumnType::Float32), &cell, None).unwrap();
        assert_eq!(value, Value::Float64(1.1));
        assert_eq!(value.to_text().as_deref(), Some("1.1"));

        LittleEndian::write_f32(&mut buffer, -0.25);
        let cell = RawCell::new(&buffer, 0, 4, false);
        assert_eq!(
            decode(&engine(), &column(ColumnType::Float32), &cell, None).unwrap(),
            Value::Float64(-0.25)
        );
    }

    #[test]
    fn test_short_cell_fails() {
        let buffer = [1u8, 2];
        let cell = RawCell::new(&buffer, 0, 2, false);
        assert!(decode(&engine(), &column(ColumnType::Int32), &cell, None).is_err());
        assert!(decode(&engine(), &column(ColumnType::Money), &cell, Some("abc")).is_err());
    }

    #[test]
    fn test_dates() {
        let mut buffer = [0u8; 8];
        LittleEndian::write_f64(&mut buffer, 42005.75);
        let cell = RawCell::new(&buffer, 0, 8, false);
        let day = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();

        let full = decode(&engine(), &column(ColumnType::DateTime), &cell, None).unwrap();
        assert_eq!(full, Value::DateTime(day.and_hms_opt(18, 0, 0).unwrap()));

        let short = column(ColumnType::DateTime).format(SHORT_DATE_FORMAT);
        assert_eq!(decode(&engine(), &short, &cell, None).unwrap(), Value::Date(day));

        LittleEndian::write_f64(&mut buffer, 1.0e12);
        let cell = RawCell::new(&buffer, 0, 8, false);
        assert!(decode(&engine(), &short, &cell, None).is_err());
    }

    #[test]
    fn test_empty_ole_is_null() {
        let buffer = [0u8; 12];
        let cell = RawCell::new(&buffer, 0, 12, false);
        assert_eq!(decode(&engine(), &column(ColumnType::OleBlob), &cell, None).unwrap(), Value::Null);
    }

    #[test]
    fn test_unreadable_ole_holds_no_lease() {
        use crate::engine::memory::MemoryDatabase;
        use serde_json::json;

        let db = MemoryDatabase::builder()
            .table(
                "Pictures",
                vec![ColumnDefinition::new("Photo", ColumnType::OleBlob)],
                vec![vec![json!([1, 2, 3])]],
            )
            .build();
        let mut engine = MemoryEngine::from_database(db);
        assert!(engine.read_catalog());
        let col = column(ColumnType::OleBlob);

        // 100 bytes on a page that does not exist
        let mut header = [0u8; 12];
        LittleEndian::write_u32(&mut header[0..4], 100);
        LittleEndian::write_u32(&mut header[4..8], 0x6300);
        let dangling = RawCell::new(&header, 0, 12, false);
        assert!(decode(&engine, &col, &dangling, None).is_err());
        assert_eq!(engine.tracker().outstanding(), 0);

        // inline length longer than the cell
        LittleEndian::write_u32(&mut header[0..4], 0x8000_0000 | 50);
        let truncated = RawCell::new(&header, 0, 12, false);
        assert!(decode(&engine, &col, &truncated, None).is_err());
        assert_eq!(engine.tracker().outstanding(), 0);

        assert!(engine.run_query("SELECT Photo FROM Pictures").is_ok());
        assert!(engine.fetch_next_row());
        let value = decode(&engine, &col, &engine.cell(0).unwrap(), None).unwrap();
        assert_eq!(value, Value::Blob(vec![1, 2, 3]));
        assert_eq!(engine.tracker().outstanding(), 0);
    }

    #[test]
    fn test_text_uses_bound_value() {
        let buffer = *b"raw";
        let cell = RawCell::new(&buffer, 0, 3, false);
        assert_eq!(
            decode(&engine(), &column(ColumnType::Memo), &cell, Some("bound")).unwrap(),
            Value::Text("bound".into())
        );
        assert_eq!(
            decode(&engine(), &column(ColumnType::Binary), &cell, Some("bound")).unwrap(),
            Value::Blob(b"raw".to_vec())
        );
        assert!(decode_text(None).is_err());
    }
}
