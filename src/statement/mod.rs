#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::BankRagError;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Column header of the statement file, fixed by the data contract.
pub const CSV_HEADER: &str =
    "Date,Transaction ID,Description,Amount,Balance,Account Number,Customer Name,Phone Number";

/// One synthetic bank transaction row.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementRecord {
    pub date: NaiveDate,
    pub transaction_id: String,
    pub description: String,
    pub amount: f64,
    pub balance: f64,
    pub account_number: String,
    pub customer_name: String,
    pub phone_number: String,
}

/// A statement row rendered as a text document, the unit of chunking
/// and embedding. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct RowDocument {
    pub content: String,
    pub source: String,
    pub row_index: usize,
}

impl StatementRecord {
    /// Render the row as header-labeled text, one field per line.
    #[inline]
    pub fn to_document_text(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "Date: {}", self.date.format("%Y-%m-%d"));
        let _ = writeln!(text, "Transaction ID: {}", self.transaction_id);
        let _ = writeln!(text, "Description: {}", self.description);
        let _ = writeln!(text, "Amount: {:.2}", self.amount);
        let _ = writeln!(text, "Balance: {:.2}", self.balance);
        let _ = writeln!(text, "Account Number: {}", self.account_number);
        let _ = writeln!(text, "Customer Name: {}", self.customer_name);
        let _ = write!(text, "Phone Number: {}", self.phone_number);
        text
    }

    fn to_csv_row(&self) -> String {
        [
            self.date.format("%Y-%m-%d").to_string(),
            self.transaction_id.clone(),
            self.description.clone(),
            format!("{:.2}", self.amount),
            format!("{:.2}", self.balance),
            self.account_number.clone(),
            self.customer_name.clone(),
            self.phone_number.clone(),
        ]
        .iter()
        .map(|field| escape_csv_field(field))
        .collect::<Vec<_>>()
        .join(",")
    }

    fn from_fields(fields: &[String], line_number: usize) -> Result<Self> {
        if fields.len() != 8 {
            return Err(BankRagError::Data(format!(
                "Line {}: expected 8 fields, found {}",
                line_number,
                fields.len()
            ))
            .into());
        }

        let date = NaiveDate::parse_from_str(&fields[0], "%Y-%m-%d").map_err(|_| {
            BankRagError::Data(format!("Line {}: invalid date '{}'", line_number, fields[0]))
        })?;
        let amount: f64 = fields[3].parse().map_err(|_| {
            BankRagError::Data(format!(
                "Line {}: invalid amount '{}'",
                line_number, fields[3]
            ))
        })?;
        let balance: f64 = fields[4].parse().map_err(|_| {
            BankRagError::Data(format!(
                "Line {}: invalid balance '{}'",
                line_number, fields[4]
            ))
        })?;

        Ok(Self {
            date,
            transaction_id: fields[1].clone(),
            description: fields[2].clone(),
            amount,
            balance,
            account_number: fields[5].clone(),
            customer_name: fields[6].clone(),
            phone_number: fields[7].clone(),
        })
    }
}

/// Write records to a CSV file with the fixed header, overwriting any
/// existing file.
#[inline]
pub fn write_csv<P: AsRef<Path>>(path: P, records: &[StatementRecord]) -> Result<()> {
    let mut output = String::with_capacity(records.len() * 128);
    output.push_str(CSV_HEADER);
    output.push('\n');

    for record in records {
        output.push_str(&record.to_csv_row());
        output.push('\n');
    }

    fs::write(path.as_ref(), output)
        .with_context(|| format!("Failed to write statement file: {}", path.as_ref().display()))?;

    Ok(())
}

/// Read records from a CSV statement file.
#[inline]
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Vec<StatementRecord>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read statement file: {}", path.as_ref().display()))?;

    let (header, body) = content
        .split_once('\n')
        .map_or((content.as_str(), ""), |(h, rest)| (h, rest));

    if header.trim().is_empty() {
        return Err(BankRagError::Data(format!(
            "Statement file is empty: {}",
            path.as_ref().display()
        ))
        .into());
    }
    if header.trim() != CSV_HEADER {
        return Err(BankRagError::Data(format!(
            "Unexpected statement header: '{}'",
            header.trim()
        ))
        .into());
    }

    let mut records = Vec::new();
    for (line_number, fields) in parse_csv_records(body) {
        records.push(StatementRecord::from_fields(&fields, line_number)?);
    }

    Ok(records)
}

/// Load a statement file as one text document per row.
#[inline]
pub fn load_documents<P: AsRef<Path>>(path: P) -> Result<Vec<RowDocument>> {
    let source = path.as_ref().display().to_string();
    let records = read_csv(path)?;

    Ok(records
        .iter()
        .enumerate()
        .map(|(row_index, record)| RowDocument {
            content: record.to_document_text(),
            source: source.clone(),
            row_index,
        })
        .collect())
}

fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split CSV body text into records, each tagged with the 1-based line
/// number it starts on (the header is line 1). Quoted fields may span
/// line breaks, so quote state carries across newlines; blank lines
/// between records are skipped.
fn parse_csv_records(body: &str) -> Vec<(usize, Vec<String>)> {
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut line = 2;
    let mut record_start_line = 2;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            '\n' if !in_quotes => {
                line += 1;
                if !fields.is_empty() || !current.trim().is_empty() {
                    fields.push(std::mem::take(&mut current));
                    records.push((record_start_line, std::mem::take(&mut fields)));
                } else {
                    current.clear();
                }
                record_start_line = line;
            }
            '\n' => {
                line += 1;
                current.push('\n');
            }
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            _ => current.push(c),
        }
    }

    if !fields.is_empty() || !current.trim().is_empty() {
        fields.push(current);
        records.push((record_start_line, fields));
    }

    records
}
