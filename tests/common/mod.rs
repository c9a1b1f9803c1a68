use std::fs::File;
use std::io::Error;
use std::path::Path;

pub const OPS_HEADER: [&str; 7] = ["op", "user", "counterparty", "amount", "location", "tx", "name"];

/// Writes an operations CSV with the given rows (each row is the seven
/// columns after the header).
pub fn write_ops(path: &Path, rows: &[[&str; 7]]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record(OPS_HEADER)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Generates a create_user row followed by `charges` unit charges, the
/// workload used by throughput-style tests.
#[allow(dead_code)]
pub fn generate_unit_charges(path: &Path, user: &str, charges: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record(OPS_HEADER)?;
    wtr.write_record(["create_user", user, "", "", "", "", "User"])?;
    for i in 1..=charges {
        let tx = format!("t{i}");
        wtr.write_record(["charge_wallet", user, "", "1", "", &tx, ""])?;
    }
    wtr.flush()?;
    Ok(())
}
