//! Record transform applied by the worker: parse CSV, append a derived
//! boolean column, serialize back.

mod records;
mod rule;

pub use records::{parse_records, serialize_records, Record, RecordTransform, DEFAULT_COLUMN};
pub use rule::{EmailRule, FieldRule};
