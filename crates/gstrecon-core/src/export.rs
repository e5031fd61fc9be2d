//! CSV export of the (filtered) reconciliation table.

use std::io::{self, Write};

use chrono::NaiveDate;

use crate::model::MismatchRecord;

/// Header row written by [`write_csv`]. Always present, never reordered.
pub const CSV_HEADER: [&str; 11] = [
    "Invoice No",
    "Supplier GSTIN",
    "Supplier Name",
    "Buyer GSTIN",
    "GSTR-1 Amount",
    "GSTR-2B Amount",
    "Difference",
    "Mismatch Type",
    "Risk Level",
    "Status",
    "Period",
];

/// Default download name, e.g. `reconciliation_2024-03-31.csv`.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("reconciliation_{}.csv", date.format("%Y-%m-%d"))
}

/// Write the header and one line per record. Returns the number of data
/// rows written.
pub fn write_csv<'a, W, I>(mut out: W, records: I) -> io::Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a MismatchRecord>,
{
    writeln!(out, "{}", CSV_HEADER.join(","))?;
    let mut rows = 0;
    for r in records {
        let fields = [
            field(&r.invoice_no),
            field(&r.supplier_gstin),
            field(&r.supplier_name),
            field(&r.buyer_gstin),
            r.gstr1_amount.to_string(),
            r.gstr2b_amount.to_string(),
            r.difference.to_string(),
            field(&r.mismatch_type),
            r.risk_level.as_str().to_string(),
            field(r.status.as_str()),
            field(&r.period),
        ];
        writeln!(out, "{}", fields.join(","))?;
        rows += 1;
    }
    Ok(rows)
}

/// Convenience wrapper returning the CSV as a string.
pub fn to_csv_string<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a MismatchRecord>,
{
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_csv(&mut buf, records);
    String::from_utf8_lossy(&buf).into_owned()
}

fn field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
