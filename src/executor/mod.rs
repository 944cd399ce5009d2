//! Query execution module
//!
//! This module decodes engine rows into owned values, materializes query
//! results and serves them through cursors.

pub mod cursor;
pub mod decoder;
pub mod materializer;
pub mod value;

pub use cursor::{Cursor, Position};
pub use decoder::{decode, decode_text, DecodeWarning};
pub use materializer::{execute, ResultColumn, ResultSet};
pub use value::Value;
