use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::report::ReportError;

/// Writes a CSV next to its destination and renames it into place, so a
/// failure part-way never leaves a truncated file behind.
pub fn write_csv_atomic<R, S>(path: &Path, header: &[String], rows: R) -> Result<(), ReportError>
where
    R: IntoIterator<Item = Vec<S>>,
    S: AsRef<[u8]>,
{
    let label = path.display().to_string();
    let io_err = |source: std::io::Error| ReportError::Io {
        path: label.clone(),
        source,
    };
    let csv_err = |source: csv::Error| ReportError::Csv {
        path: label.clone(),
        source,
    };

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(io_err)?;
    let tmp = NamedTempFile::new_in(dir).map_err(io_err)?;

    let mut w = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(tmp);
    w.write_record(header).map_err(csv_err)?;
    for row in rows {
        w.write_record(row).map_err(csv_err)?;
    }
    let mut tmp = w
        .into_inner()
        .map_err(|e| io_err(e.into_error()))?;
    tmp.flush().map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/table.rs"]
mod tests;
