//! Arrow schemas and record batches for the console's tables.
//!
//! The CLI pretty-prints these batches; keeping the column layout here means
//! every table of a given kind renders the same way.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray, UInt8Array, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

use crate::model::{AuditEntry, MismatchRecord, Vendor};

/// Schema for reconciliation (mismatch) rows.
pub fn reconciliation_schema() -> Schema {
    Schema::new(vec![
        Field::new("invoice_no", DataType::Utf8, false),
        Field::new("supplier_gstin", DataType::Utf8, false),
        Field::new("buyer_gstin", DataType::Utf8, false),
        Field::new("gstr1_amount", DataType::Float64, false),
        Field::new("gstr2b_amount", DataType::Float64, false),
        Field::new("difference", DataType::Float64, false),
        Field::new("mismatch_type", DataType::Utf8, false),
        Field::new("risk", DataType::Utf8, false),
        Field::new("status", DataType::Utf8, false),
        Field::new("period", DataType::Utf8, true),
    ])
}

/// Schema for the audit trail overview (one row per entry; detail text is
/// shown on cards instead).
pub fn audit_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("inv_no", DataType::Utf8, false),
        Field::new("mismatch_type", DataType::Utf8, true),
        Field::new("severity", DataType::Utf8, false),
        Field::new("status", DataType::Utf8, false),
        Field::new("amount", DataType::Float64, true),
        Field::new("period", DataType::Utf8, true),
    ])
}

pub fn vendor_schema() -> Schema {
    Schema::new(vec![
        Field::new("gstin", DataType::Utf8, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("score", DataType::UInt8, false),
        Field::new("filing_rate", DataType::UInt8, false),
        Field::new("mismatches", DataType::UInt32, false),
        Field::new("itc_at_risk", DataType::Float64, false),
        Field::new("risk", DataType::Utf8, false),
    ])
}

fn utf8<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values))
}

fn nullable_utf8<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    Arc::new(
        values
            .map(|v| if v.is_empty() { None } else { Some(v) })
            .collect::<StringArray>(),
    )
}

fn f64s(values: impl Iterator<Item = f64>) -> ArrayRef {
    Arc::new(Float64Array::from_iter_values(values))
}

pub fn records_to_batch(records: &[&MismatchRecord]) -> Result<RecordBatch, ArrowError> {
    let columns: Vec<ArrayRef> = vec![
        utf8(records.iter().map(|r| r.invoice_no.as_str())),
        utf8(records.iter().map(|r| r.supplier_gstin.as_str())),
        utf8(records.iter().map(|r| r.buyer_gstin.as_str())),
        f64s(records.iter().map(|r| r.gstr1_amount)),
        f64s(records.iter().map(|r| r.gstr2b_amount)),
        f64s(records.iter().map(|r| r.difference)),
        utf8(records.iter().map(|r| r.mismatch_type.as_str())),
        utf8(records.iter().map(|r| r.risk_level.as_str())),
        utf8(records.iter().map(|r| r.status.as_str())),
        nullable_utf8(records.iter().map(|r| r.period.as_str())),
    ];
    RecordBatch::try_new(Arc::new(reconciliation_schema()), columns)
}

pub fn audit_to_batch(entries: &[AuditEntry]) -> Result<RecordBatch, ArrowError> {
    let columns: Vec<ArrayRef> = vec![
        utf8(entries.iter().map(|e| e.id.as_str())),
        utf8(entries.iter().map(|e| e.inv_no.as_str())),
        nullable_utf8(entries.iter().map(|e| e.mismatch_type.as_str())),
        utf8(entries.iter().map(|e| e.severity.as_str())),
        utf8(entries.iter().map(|e| e.status.as_str())),
        f64s(entries.iter().map(|e| e.amount)),
        nullable_utf8(entries.iter().map(|e| e.period.as_str())),
    ];
    RecordBatch::try_new(Arc::new(audit_schema()), columns)
}

pub fn vendors_to_batch(vendors: &[&Vendor]) -> Result<RecordBatch, ArrowError> {
    let columns: Vec<ArrayRef> = vec![
        utf8(vendors.iter().map(|v| v.gstin.as_str())),
        utf8(vendors.iter().map(|v| v.name.as_str())),
        Arc::new(UInt8Array::from_iter_values(vendors.iter().map(|v| v.compliance_score))),
        Arc::new(UInt8Array::from_iter_values(vendors.iter().map(|v| v.filing_rate))),
        Arc::new(UInt32Array::from_iter_values(vendors.iter().map(|v| v.mismatch_count))),
        f64s(vendors.iter().map(|v| v.itc_at_risk)),
        utf8(vendors.iter().map(|v| v.risk_level.as_str())),
    ];
    RecordBatch::try_new(Arc::new(vendor_schema()), columns)
}
