use std::io::Error;
use std::path::Path;

/// Writes a status fixture, one `(origin, reference, status)` row per entry.
pub fn write_records(path: &Path, rows: &[(&str, &str, &str)]) -> Result<(), Error> {
    let mut wtr = csv::WriterBuilder::new().from_path(path)?;
    wtr.write_record(["origin", "reference", "status", "amount", "currency"])?;

    for (origin, reference, status) in rows {
        wtr.write_record([*origin, *reference, *status, "", ""])?;
    }

    wtr.flush()?;
    Ok(())
}
