//! Command-line behavior of the churnlens binary

use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_missing_input_exits_with_status_one() {
    let temp_dir = tempdir().unwrap();
    let input = temp_dir.path().join("ecommerce_customer_data_large.csv");

    let output = Command::new(env!("CARGO_BIN_EXE_churnlens"))
        .arg("--input")
        .arg(&input)
        .arg("--output-dir")
        .arg(temp_dir.path().join("plots"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: '"));
    assert!(stderr.contains("not found. Please ensure the file is in the correct directory."));
    assert!(!temp_dir.path().join("plots").exists());
}
