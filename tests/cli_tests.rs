use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod common;

#[test]
fn end_to_end_summaries() {
    let dir = tempfile::tempdir().unwrap();
    let ops = dir.path().join("ops.csv");
    let locations = dir.path().join("locations.json");

    common::write_ops(
        &ops,
        &[
            ["create_user", "u1", "", "", "", "", "Alice"],
            ["create_user", "u2", "", "", "", "", "Bob"],
            ["charge_wallet", "u1", "", "100", "loc1", "t1", ""],
            ["debit_wallet", "u1", "", "30", "loc2", "t2", ""],
            ["transfer_wallet", "u1", "u2", "20", "", "t3", ""],
        ],
    )
    .unwrap();
    std::fs::write(&locations, r#"{"loc1": "Shibuya Station"}"#).unwrap();

    let mut cmd = Command::new(cargo_bin!("wallet-ledger"));
    cmd.arg(&ops).arg("--locations").arg(&locations);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"userName\":\"Alice\""))
        .stdout(predicate::str::contains("\"currentAmount\":50"))
        .stdout(predicate::str::contains("\"totalChargeAmount\":100"))
        .stdout(predicate::str::contains("\"totalUseAmount\":50"))
        .stdout(predicate::str::contains("\"Shibuya Station\":1"))
        .stdout(predicate::str::contains("\"unknown\":1"))
        .stdout(predicate::str::contains("\"userName\":\"Bob\""))
        .stdout(predicate::str::contains("\"currentAmount\":20"));
}

#[test]
fn rejected_and_malformed_rows_do_not_stop_processing() {
    let dir = tempfile::tempdir().unwrap();
    let ops = dir.path().join("ops.csv");

    common::write_ops(
        &ops,
        &[
            ["create_user", "u1", "", "", "", "", "Alice"],
            // Overdraft: rejected, processing continues.
            ["debit_wallet", "u1", "", "999", "", "t1", ""],
            // Unknown op: skipped.
            ["explode_wallet", "u1", "", "1", "", "t2", ""],
            ["charge_wallet", "u1", "", "40", "", "t3", ""],
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("wallet-ledger"));
    cmd.arg(&ops);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"currentAmount\":40"))
        .stdout(predicate::str::contains("\"totalUseAmount\":0"));
}

#[test]
fn unit_charge_workload_sums_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let ops = dir.path().join("ops.csv");
    common::generate_unit_charges(&ops, "u1", 250).unwrap();

    let mut cmd = Command::new(cargo_bin!("wallet-ledger"));
    cmd.arg(&ops);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"currentAmount\":250"))
        .stdout(predicate::str::contains("\"totalChargeAmount\":250"));
}
