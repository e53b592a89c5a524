#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: seed and attempt settlement; every charge is declined
    let mut customers = tempfile::NamedTempFile::new().unwrap();
    writeln!(customers, "id, currency").unwrap();
    writeln!(customers, "1, EUR").unwrap();
    let mut invoices = tempfile::NamedTempFile::new().unwrap();
    writeln!(invoices, "id, customer, amount, currency, status").unwrap();
    writeln!(invoices, "1, 1, 100.0, EUR, pending").unwrap();
    writeln!(invoices, "2, 1, 50.0, EUR, pending").unwrap();

    let output1 = Command::new(cargo_bin!())
        .arg("--db-path")
        .arg(&db_path)
        .arg("--customers")
        .arg(customers.path())
        .arg("--invoices")
        .arg(invoices.path())
        .arg("--provider")
        .arg("decline")
        .arg("process")
        .output()
        .expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("PaymentUnsuccessful,2"));

    // 2. Second run: no seed, the close pass sees the invoices left pending
    let output2 = Command::new(cargo_bin!())
        .arg("--db-path")
        .arg(&db_path)
        .arg("close")
        .output()
        .expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    assert!(stdout2.contains("Overdue,2"));

    // 3. Third run: the audit trail from both runs is still there
    let output3 = Command::new(cargo_bin!())
        .arg("--db-path")
        .arg(&db_path)
        .arg("report")
        .output()
        .expect("Failed to execute command");
    let stdout3 = String::from_utf8_lossy(&output3.stdout);
    assert!(stdout3.contains("PaymentUnsuccessful,2"));
    assert!(stdout3.contains("Overdue,2"));
}
