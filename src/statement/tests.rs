use super::*;
use chrono::NaiveDate;
use tempfile::TempDir;

fn sample_record() -> StatementRecord {
    StatementRecord {
        date: NaiveDate::from_ymd_opt(2026, 3, 14).expect("valid date"),
        transaction_id: "a3f1c2d4-0000-4000-8000-000000000001".to_string(),
        description: "Grocery Store".to_string(),
        amount: -42.17,
        balance: 10543.22,
        account_number: "GB82WEST12345698765432".to_string(),
        customer_name: "Jordan Avery".to_string(),
        phone_number: "555-867-5309".to_string(),
    }
}

#[test]
fn document_text_labels_every_field() {
    let text = sample_record().to_document_text();

    assert!(text.contains("Date: 2026-03-14"));
    assert!(text.contains("Transaction ID: a3f1c2d4"));
    assert!(text.contains("Description: Grocery Store"));
    assert!(text.contains("Amount: -42.17"));
    assert!(text.contains("Balance: 10543.22"));
    assert!(text.contains("Account Number: GB82WEST12345698765432"));
    assert!(text.contains("Customer Name: Jordan Avery"));
    assert!(text.contains("Phone Number: 555-867-5309"));
    assert_eq!(text.lines().count(), 8);
}

#[test]
fn csv_round_trip() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("statement.csv");

    let mut second = sample_record();
    second.description = "Salary Deposit".to_string();
    second.amount = 1850.0;

    let records = vec![sample_record(), second];
    write_csv(&path, &records).expect("write succeeds");

    let loaded = read_csv(&path).expect("read succeeds");
    assert_eq!(loaded, records);
}

#[test]
fn fields_with_commas_survive_round_trip() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("statement.csv");

    let mut record = sample_record();
    record.customer_name = "Avery, Jordan \"JJ\"".to_string();

    write_csv(&path, std::slice::from_ref(&record)).expect("write succeeds");
    let loaded = read_csv(&path).expect("read succeeds");
    assert_eq!(loaded[0].customer_name, record.customer_name);
}

#[test]
fn fields_with_newlines_survive_round_trip() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("statement.csv");

    let mut first = sample_record();
    first.customer_name = "Jordan\nAvery".to_string();
    let mut second = sample_record();
    second.description = "Utility Bill\n(autopay)".to_string();

    let records = vec![first, second];
    write_csv(&path, &records).expect("write succeeds");

    let loaded = read_csv(&path).expect("quoted newlines should parse");
    assert_eq!(loaded, records);
    assert_eq!(loaded[0].customer_name, "Jordan\nAvery");
}

#[test]
fn load_documents_yields_one_per_row() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("statement.csv");

    let records = vec![sample_record(), sample_record(), sample_record()];
    write_csv(&path, &records).expect("write succeeds");

    let documents = load_documents(&path).expect("load succeeds");
    assert_eq!(documents.len(), 3);
    assert_eq!(documents[2].row_index, 2);
    assert!(documents[0].source.ends_with("statement.csv"));
    assert!(documents[0].content.starts_with("Date: 2026-03-14"));
}

#[test]
fn rejects_wrong_header() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("statement.csv");
    std::fs::write(&path, "Date,Amount\n2026-01-01,5.00\n").expect("write succeeds");

    assert!(read_csv(&path).is_err());
}

#[test]
fn rejects_malformed_row() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("statement.csv");
    std::fs::write(&path, format!("{}\nnot,enough,fields\n", CSV_HEADER)).expect("write succeeds");

    let err = read_csv(&path).expect_err("short row should fail");
    assert!(err.to_string().contains("Line 2"));
    assert!(matches!(
        err.downcast_ref::<BankRagError>(),
        Some(BankRagError::Data(_))
    ));
}

#[test]
fn empty_lines_are_skipped() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("statement.csv");

    write_csv(&path, &[sample_record()]).expect("write succeeds");
    let mut content = std::fs::read_to_string(&path).expect("read succeeds");
    content.push('\n');
    std::fs::write(&path, content).expect("write succeeds");

    let loaded = read_csv(&path).expect("read succeeds");
    assert_eq!(loaded.len(), 1);
}
