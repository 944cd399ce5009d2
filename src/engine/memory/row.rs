//! Row codec for the memory engine
//!
//! A row is stored as a column directory followed by the data area:
//!
//! ```text
//! u16 column count
//! per column: u16 offset | u16 length | u8 flags (bit0 = null)
//! data bytes
//! ```
//!
//! Offsets are relative to the start of the row. Booleans live only in the
//! directory: a set bit is stored with length 0, a cleared bit with length 1.
//!
//! OLE and memo columns hold a 12-byte header in the row. Small values follow
//! the header inline; larger ones are written as a chain of long-value records
//! on separate pages.

use byteorder::{ByteOrder, LittleEndian};
use bytes::BufMut;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;

use super::eval::Scalar;
use super::page::{PageStore, PageType, RecordPointer, MAX_RECORD_SIZE};
use crate::catalog::{ColumnDefinition, ColumnType, TableDefinition};
use crate::engine::{datetime_to_days, days_to_datetime, RawCell};
use crate::error::{Error, Result};

/// Size of the in-row header of an OLE or memo value
pub const LONG_VALUE_HEADER_SIZE: usize = 12;
/// Header flag: data follows the header inside the row
pub const LVAL_INLINE: u32 = 0x8000_0000;
/// Header flag: data is one record on a long-value page
pub const LVAL_SINGLE_PAGE: u32 = 0x4000_0000;
const LVAL_LENGTH_MASK: u32 = 0x3fff_ffff;
/// Largest value kept inline
pub const INLINE_LIMIT: usize = 64;
/// Next-pointer value that ends a long-value chain
const LVAL_CHAIN_END: u32 = u32::MAX;
const LVAL_CHUNK_SIZE: usize = MAX_RECORD_SIZE - 4;

const DIRECTORY_ENTRY_SIZE: usize = 5;
const NULL_FLAG: u8 = 0x01;

/// Money is a 64-bit integer scaled by 10^4
const MONEY_SCALE: f64 = 10_000.0;

/// Position of one column inside a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSlot {
    pub offset: usize,
    pub length: usize,
    pub is_null: bool,
}

struct Field {
    data: Vec<u8>,
    is_null: bool,
}

impl Field {
    fn null() -> Self {
        Self {
            data: Vec::new(),
            is_null: true,
        }
    }

    fn value(data: Vec<u8>) -> Self {
        Self {
            data,
            is_null: false,
        }
    }
}

/// Encode one row of positional JSON values. Long values are written to the
/// store as a side effect.
pub fn encode_row(store: &mut PageStore, table: &TableDefinition, values: &[JsonValue]) -> Result<Vec<u8>> {
    if values.len() > table.column_count() {
        return Err(Error::InvalidDatabase(format!(
            "table {}: row has {} values for {} columns",
            table.name(),
            values.len(),
            table.column_count()
        )));
    }

    let fields = table
        .columns()
        .enumerate()
        .map(|(i, column)| encode_field(store, column, values.get(i).unwrap_or(&JsonValue::Null)))
        .collect::<Result<Vec<_>>>()?;

    let directory_size = 2 + fields.len() * DIRECTORY_ENTRY_SIZE;
    let data_size: usize = fields.iter().map(|f| f.data.len()).sum();
    if directory_size + data_size > MAX_RECORD_SIZE {
        return Err(Error::InvalidDatabase(format!(
            "table {}: row of {} bytes does not fit on a page",
            table.name(),
            directory_size + data_size
        )));
    }

    let mut row = Vec::with_capacity(directory_size + data_size);
    row.put_u16_le(fields.len() as u16);
    let mut offset = directory_size;
    for field in &fields {
        row.put_u16_le(offset as u16);
        row.put_u16_le(field.data.len() as u16);
        row.put_u8(if field.is_null { NULL_FLAG } else { 0 });
        offset += field.data.len();
    }
    for field in &fields {
        row.put_slice(&field.data);
    }
    Ok(row)
}

/// Read the column directory of a stored row
pub fn read_directory(row: &[u8]) -> Result<Vec<CellSlot>> {
    let count = row
        .get(0..2)
        .map(LittleEndian::read_u16)
        .ok_or_else(|| Error::Decode("row too short for its header".to_string()))? as usize;

    let mut slots = Vec::with_capacity(count);
    for i in 0..count {
        let at = 2 + i * DIRECTORY_ENTRY_SIZE;
        let entry = row
            .get(at..at + DIRECTORY_ENTRY_SIZE)
            .ok_or_else(|| Error::Decode(format!("row directory truncated at column {}", i)))?;
        let slot = CellSlot {
            offset: LittleEndian::read_u16(&entry[0..2]) as usize,
            length: LittleEndian::read_u16(&entry[2..4]) as usize,
            is_null: entry[4] & NULL_FLAG != 0,
        };
        if slot.offset + slot.length > row.len() {
            return Err(Error::Decode(format!("column {} points outside the row", i)));
        }
        slots.push(slot);
    }
    Ok(slots)
}

fn encode_field(store: &mut PageStore, column: &ColumnDefinition, value: &JsonValue) -> Result<Field> {
    let invalid = |what: &str| {
        Error::InvalidDatabase(format!(
            "column {}.{}: {} is not a valid {}",
            column.table_name, column.name, value, what
        ))
    };

    let mut buf = Vec::new();
    match column.column_type {
        ColumnType::Bool => {
            let set = match value {
                JsonValue::Null => false,
                JsonValue::Bool(b) => *b,
                JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
                JsonValue::String(s) => {
                    matches!(s.to_ascii_lowercase().as_str(), "true" | "yes" | "1" | "-1")
                }
                _ => return Err(invalid("boolean")),
            };
            if !set {
                buf.put_u8(0);
            }
        }
        _ if value.is_null() => return Ok(Field::null()),
        ColumnType::Byte => {
            let n = value.as_u64().filter(|n| *n <= u8::MAX as u64).ok_or_else(|| invalid("byte"))?;
            buf.put_u8(n as u8);
        }
        ColumnType::Int16 => {
            let n = value
                .as_i64()
                .and_then(|n| i16::try_from(n).ok())
                .ok_or_else(|| invalid("integer"))?;
            buf.put_i16_le(n);
        }
        ColumnType::Int32 | ColumnType::Complex => {
            let n = value
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| invalid("long integer"))?;
            buf.put_i32_le(n);
        }
        ColumnType::Money => {
            let f = value.as_f64().ok_or_else(|| invalid("currency"))?;
            buf.put_i64_le((f * MONEY_SCALE).round() as i64);
        }
        ColumnType::Float32 => buf.put_f32_le(value.as_f64().ok_or_else(|| invalid("single"))? as f32),
        ColumnType::Float64 => buf.put_f64_le(value.as_f64().ok_or_else(|| invalid("double"))?),
        ColumnType::DateTime => {
            let days = match value {
                JsonValue::Number(n) => n.as_f64(),
                JsonValue::String(s) => parse_datetime(s).map(datetime_to_days),
                _ => None,
            }
            .ok_or_else(|| invalid("date"))?;
            buf.put_f64_le(days);
        }
        ColumnType::Numeric => {
            let f = value.as_f64().ok_or_else(|| invalid("decimal"))?;
            let scaled = (f.abs() * 10f64.powi(column.scale as i32)).round() as u128;
            buf.put_u8(if f < 0.0 { 0x80 } else { 0 });
            buf.put_u128_le(scaled);
        }
        ColumnType::RepId => {
            let text = value.as_str().ok_or_else(|| invalid("replication id"))?;
            buf.put_slice(&parse_guid(text).ok_or_else(|| invalid("replication id"))?);
        }
        ColumnType::Text => buf.put_slice(value.as_str().ok_or_else(|| invalid("text"))?.as_bytes()),
        ColumnType::Binary | ColumnType::Unknown => {
            buf.put_slice(&json_bytes(value).ok_or_else(|| invalid("binary value"))?)
        }
        ColumnType::Memo => {
            let text = value.as_str().ok_or_else(|| invalid("memo"))?;
            buf = write_long_value(store, text.as_bytes())?;
        }
        ColumnType::OleBlob => {
            let data = json_bytes(value).ok_or_else(|| invalid("OLE object"))?;
            buf = write_long_value(store, &data)?;
        }
    }
    Ok(Field::value(buf))
}

/// Strings are taken as UTF-8, arrays as raw bytes
fn json_bytes(value: &JsonValue) -> Option<Vec<u8>> {
    match value {
        JsonValue::String(s) => Some(s.as_bytes().to_vec()),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect(),
        _ => None,
    }
}

/// Write a long value and return its in-row representation
pub fn write_long_value(store: &mut PageStore, data: &[u8]) -> Result<Vec<u8>> {
    let mut header = Vec::with_capacity(LONG_VALUE_HEADER_SIZE + INLINE_LIMIT);
    if data.is_empty() {
        header.put_bytes(0, LONG_VALUE_HEADER_SIZE);
        return Ok(header);
    }
    if data.len() > LVAL_LENGTH_MASK as usize {
        return Err(Error::InvalidDatabase(format!("long value of {} bytes", data.len())));
    }

    if data.len() <= INLINE_LIMIT {
        header.put_u32_le(data.len() as u32 | LVAL_INLINE);
        header.put_u32_le(0);
        header.put_u32_le(0);
        header.put_slice(data);
        return Ok(header);
    }

    // Chunks are written back to front so each one knows its successor
    let mut next = LVAL_CHAIN_END;
    let chunks: Vec<&[u8]> = data.chunks(LVAL_CHUNK_SIZE).collect();
    for chunk in chunks.iter().rev() {
        let mut record = Vec::with_capacity(4 + chunk.len());
        record.put_u32_le(next);
        record.put_slice(chunk);
        next = store.append(PageType::LongValue, &record)?.to_u32();
    }

    let flags = if chunks.len() == 1 { LVAL_SINGLE_PAGE } else { 0 };
    header.put_u32_le(data.len() as u32 | flags);
    header.put_u32_le(next);
    header.put_u32_le(0);
    Ok(header)
}

/// Read the full value behind an in-row long-value header
pub fn read_long_value(store: &PageStore, header: &[u8]) -> Result<Vec<u8>> {
    if header.len() < LONG_VALUE_HEADER_SIZE {
        return Err(Error::Decode("long value header truncated".to_string()));
    }
    let raw = LittleEndian::read_u32(&header[0..4]);
    let length = (raw & LVAL_LENGTH_MASK) as usize;

    if raw & LVAL_INLINE != 0 {
        return header
            .get(LONG_VALUE_HEADER_SIZE..LONG_VALUE_HEADER_SIZE + length)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::Decode("inline long value truncated".to_string()));
    }

    let mut data = Vec::with_capacity(length);
    let mut pointer = LittleEndian::read_u32(&header[4..8]);
    // a chain can never be longer than the store
    let mut budget = store.page_count() * super::page::MAX_SLOTS;
    while data.len() < length {
        if pointer == LVAL_CHAIN_END || budget == 0 {
            return Err(Error::Decode(format!(
                "long value chain ended after {} of {} bytes",
                data.len(),
                length
            )));
        }
        budget -= 1;

        let record = store
            .record(RecordPointer::from_u32(pointer))
            .filter(|r| r.len() >= 4)
            .ok_or_else(|| Error::Decode(format!("dangling long value pointer {:#x}", pointer)))?;
        pointer = LittleEndian::read_u32(&record[0..4]);
        data.extend_from_slice(&record[4..]);
        if raw & LVAL_SINGLE_PAGE != 0 {
            break;
        }
    }

    data.truncate(length);
    Ok(data)
}

/// Interpret a stored cell
pub fn read_scalar(store: &PageStore, column: &ColumnDefinition, cell: &RawCell<'_>) -> Result<Scalar> {
    let short = || Error::Decode(format!("column {}: cell too short", column.name));
    let scalar = match column.column_type {
        ColumnType::Bool => Scalar::Bool(cell.is_empty()),
        _ if cell.is_null() => Scalar::Null,
        ColumnType::Byte => Scalar::Int(cell.get_u8(0).ok_or_else(short)? as i64),
        ColumnType::Int16 => Scalar::Int(cell.get_i16(0).ok_or_else(short)? as i64),
        ColumnType::Int32 | ColumnType::Complex => Scalar::Int(cell.get_i32(0).ok_or_else(short)? as i64),
        ColumnType::Money => Scalar::Float(cell.get_i64(0).ok_or_else(short)? as f64 / MONEY_SCALE),
        ColumnType::Float32 => Scalar::Float(cell.get_f32(0).ok_or_else(short)? as f64),
        ColumnType::Float64 => Scalar::Float(cell.get_f64(0).ok_or_else(short)?),
        ColumnType::DateTime => Scalar::DateTime(cell.get_f64(0).ok_or_else(short)?),
        ColumnType::Numeric => Scalar::Float(read_numeric(cell, column.scale).ok_or_else(short)?),
        ColumnType::RepId => Scalar::Text(format_guid(cell.bytes().ok_or_else(short)?).ok_or_else(short)?),
        ColumnType::Text => Scalar::Text(String::from_utf8_lossy(cell.bytes().ok_or_else(short)?).into_owned()),
        ColumnType::Memo => {
            let data = read_long_value(store, cell.bytes().ok_or_else(short)?)?;
            Scalar::Text(String::from_utf8_lossy(&data).into_owned())
        }
        ColumnType::OleBlob => Scalar::Bytes(read_long_value(store, cell.bytes().ok_or_else(short)?)?),
        ColumnType::Binary | ColumnType::Unknown => Scalar::Bytes(cell.bytes().ok_or_else(short)?.to_vec()),
    };
    Ok(scalar)
}

/// Render a stored cell the way it is bound as text for the client
pub fn render_cell(store: &PageStore, column: &ColumnDefinition, cell: &RawCell<'_>) -> Result<String> {
    let text = match read_scalar(store, column, cell)? {
        Scalar::Null => String::new(),
        Scalar::Bool(b) => (if b { "1" } else { "0" }).to_string(),
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(f) if column.column_type == ColumnType::Money => format!("{:.4}", f),
        Scalar::Float(f) if column.column_type == ColumnType::Numeric => {
            format!("{:.*}", column.scale as usize, f)
        }
        Scalar::Float(f) => f.to_string(),
        Scalar::DateTime(days) => match days_to_datetime(days) {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => days.to_string(),
        },
        Scalar::Text(s) => s,
        Scalar::Bytes(b) => String::from_utf8_lossy(&b).into_owned(),
    };
    Ok(text)
}

/// Numeric: sign byte (0x80 = negative), then a 128-bit magnitude
pub fn read_numeric(cell: &RawCell<'_>, scale: u32) -> Option<f64> {
    let bytes = cell.bytes()?;
    if bytes.len() < 17 {
        return None;
    }
    let magnitude = LittleEndian::read_u128(&bytes[1..17]) as f64 / 10f64.powi(scale as i32);
    Some(if bytes[0] & 0x80 != 0 { -magnitude } else { magnitude })
}

/// Parse the date and time spellings accepted in database files and queries
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// GUIDs store their first three groups little-endian
fn parse_guid(text: &str) -> Option<[u8; 16]> {
    let hex: String = text.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    let stripped = text.trim_matches(|c| c == '{' || c == '}');
    if hex.len() != 32 || stripped.chars().any(|c| !(c.is_ascii_hexdigit() || c == '-')) {
        return None;
    }

    let mut raw = [0u8; 16];
    for (i, byte) in raw.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    raw[0..4].reverse();
    raw[4..6].reverse();
    raw[6..8].reverse();
    Some(raw)
}

fn format_guid(bytes: &[u8]) -> Option<String> {
    if bytes.len() != 16 {
        return None;
    }
    let hex = |range: &[u8]| range.iter().map(|b| format!("{:02X}", b)).collect::<String>();
    Some(format!(
        "{{{:08X}-{:04X}-{:04X}-{}-{}}}",
        LittleEndian::read_u32(&bytes[0..4]),
        LittleEndian::read_u16(&bytes[4..6]),
        LittleEndian::read_u16(&bytes[6..8]),
        hex(&bytes[8..10]),
        hex(&bytes[10..16])
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn books() -> TableDefinition {
        TableDefinition::from_columns(
            "Books",
            vec![
                ColumnDefinition::new("Id", ColumnType::Int32),
                ColumnDefinition::new("Title", ColumnType::Text),
                ColumnDefinition::new("InPrint", ColumnType::Bool),
                ColumnDefinition::new("Price", ColumnType::Money),
                ColumnDefinition::new("Cover", ColumnType::OleBlob),
            ],
        )
    }

    fn cells<'a>(row: &'a [u8]) -> Vec<RawCell<'a>> {
        read_directory(row)
            .unwrap()
            .into_iter()
            .map(|s| RawCell::new(row, s.offset, s.length, s.is_null))
            .collect()
    }

    #[test]
    fn test_row_layout() {
        let mut store = PageStore::new();
        let table = books();
        let row = encode_row(&mut store, &table, &[json!(7), json!("Go"), json!(true), json!(12.5)]).unwrap();

        let cells = cells(&row);
        assert_eq!(cells.len(), 5);
        assert_eq!(cells[0].get_i32(0), Some(7));
        assert_eq!(cells[1].bytes(), Some(&b"Go"[..]));
        // set bit: zero length
        assert!(cells[2].is_empty());
        assert!(!cells[2].is_null());
        assert_eq!(cells[3].get_i64(0), Some(125_000));
        // missing trailing value is null
        assert!(cells[4].is_null());
    }

    #[test]
    fn test_cleared_bool_has_length_one() {
        let mut store = PageStore::new();
        let row = encode_row(&mut store, &books(), &[json!(1), json!(null), json!(false)]).unwrap();
        let cells = cells(&row);
        assert_eq!(cells[2].len(), 1);
        assert!(cells[1].is_null());
    }

    #[test]
    fn test_too_many_values() {
        let mut store = PageStore::new();
        let values = vec![json!(1); 6];
        assert!(encode_row(&mut store, &books(), &values).is_err());
    }

    #[test]
    fn test_invalid_value() {
        let mut store = PageStore::new();
        let err = encode_row(&mut store, &books(), &[json!("seven")]).unwrap_err();
        assert!(err.to_string().contains("Books.Id"));
    }

    #[test]
    fn test_long_values() {
        let mut store = PageStore::new();

        let small = write_long_value(&mut store, b"tiny").unwrap();
        assert_eq!(LittleEndian::read_u32(&small[0..4]), 4 | LVAL_INLINE);
        assert_eq!(read_long_value(&store, &small).unwrap(), b"tiny");
        assert_eq!(store.page_count(), 0);

        let medium = vec![0xABu8; 1000];
        let header = write_long_value(&mut store, &medium).unwrap();
        assert_eq!(header.len(), LONG_VALUE_HEADER_SIZE);
        assert_eq!(LittleEndian::read_u32(&header[0..4]), 1000 | LVAL_SINGLE_PAGE);
        assert_eq!(read_long_value(&store, &header).unwrap(), medium);

        let large: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let header = write_long_value(&mut store, &large).unwrap();
        assert_eq!(LittleEndian::read_u32(&header[0..4]), 10_000);
        assert_eq!(read_long_value(&store, &header).unwrap(), large);

        let empty = write_long_value(&mut store, &[]).unwrap();
        assert_eq!(empty, vec![0u8; LONG_VALUE_HEADER_SIZE]);
    }

    #[test]
    fn test_dangling_long_value() {
        let store = PageStore::new();
        let mut header = Vec::new();
        header.put_u32_le(500);
        header.put_u32_le(RecordPointer { page_id: 3, slot: 0 }.to_u32());
        header.put_u32_le(0);
        assert!(read_long_value(&store, &header).is_err());
    }

    #[test]
    fn test_render_cells() {
        let mut store = PageStore::new();
        let table = TableDefinition::from_columns(
            "T",
            vec![
                ColumnDefinition::new("Flag", ColumnType::Bool),
                ColumnDefinition::new("Price", ColumnType::Money),
                ColumnDefinition::new("When", ColumnType::DateTime),
                ColumnDefinition::new("Amount", ColumnType::Numeric).precision(10, 2),
                ColumnDefinition::new("Guid", ColumnType::RepId),
                ColumnDefinition::new("Notes", ColumnType::Memo),
            ],
        );
        let row = encode_row(
            &mut store,
            &table,
            &[
                json!(false),
                json!(3.5),
                json!("2015-01-01 18:30:00"),
                json!(-12.5),
                json!("{6F9619FF-8B86-D011-B42D-00C04FC964FF}"),
                json!("a memo"),
            ],
        )
        .unwrap();

        let cells = cells(&row);
        let rendered: Vec<String> = table
            .columns()
            .zip(&cells)
            .map(|(col, cell)| render_cell(&store, col, cell).unwrap())
            .collect();
        assert_eq!(
            rendered,
            vec![
                "0",
                "3.5000",
                "2015-01-01 18:30:00",
                "-12.50",
                "{6F9619FF-8B86-D011-B42D-00C04FC964FF}",
                "a memo",
            ]
        );
        assert_eq!(cells[4].get_u32(0), Some(0x6F9619FF));
    }

    #[test]
    fn test_parse_datetime() {
        let expected = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(parse_datetime("2015-01-01"), Some(expected));
        assert_eq!(parse_datetime("01/01/2015"), Some(expected));
        assert!(parse_datetime("yesterday").is_none());
    }
}
