//! Delimited output of flat rows and replacement records.
//!
//! Both tables are written as CSV and TSV with CRLF line endings. Ids are
//! written bare and terms are double-quoted with embedded quotes doubled.

use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{FlatFileError, FlatFileResult};
use crate::projector::FlatRow;
use crate::store::ReleaseContext;

/// Column headers of the flat file.
pub const FLAT_FILE_HEADER: [&str; 17] = [
    "CTPP SCTID",
    "CTPP PT",
    "ARTG_ID",
    "TPP SCTID",
    "TPP PT",
    "TPUU SCTID",
    "TPUU PT",
    "TPP TP SCTID",
    "TPP TP PT",
    "TPUU TP SCTID",
    "TPUU TP PT",
    "MPP SCTID",
    "MPP PT",
    "MPUU SCTID",
    "MPUU PT",
    "MP SCTID",
    "MP PT",
];

/// Column headers of the replacement file.
pub const REPLACEMENT_HEADER: [&str; 7] = [
    "INACTIVE SCTID",
    "INACTIVE PT",
    "REPLACEMENT TYPE SCTID",
    "REPLACEMENT TYPE PT",
    "REPLACEMENT SCTID",
    "REPLACEMENT PT",
    "DATE",
];

const LINE_END: &str = "\r\n";

/// Delimited output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    /// Comma separated.
    Csv,
    /// Tab separated.
    Tsv,
}

impl FileFormat {
    /// Both formats, in the order they are written.
    pub const ALL: [FileFormat; 2] = [FileFormat::Csv, FileFormat::Tsv];

    /// Field delimiter.
    pub fn delimiter(self) -> &'static str {
        match self {
            FileFormat::Csv => ",",
            FileFormat::Tsv => "\t",
        }
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Tsv => "tsv",
        }
    }

    /// Appends this format's extension to an output base path.
    pub fn file_path(self, base: &Path) -> PathBuf {
        let mut path = OsString::from(base.as_os_str());
        path.push(".");
        path.push(self.extension());
        PathBuf::from(path)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Quotes a term, doubling embedded quotes.
pub fn quote(term: &str) -> String {
    format!("\"{}\"", term.replace('"', "\"\""))
}

/// Rejects an output path that is a symlink or an existing non-regular file.
pub fn validate_output(path: &Path) -> FlatFileResult<()> {
    let invalid = |reason: &str| FlatFileError::InvalidOutput {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => Err(invalid("is a symbolic link")),
        Ok(meta) if !meta.is_file() => Err(invalid("exists and is not a regular file")),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FlatFileError::io(path, e)),
    }
}

fn flat_record(row: &FlatRow) -> [String; 17] {
    [
        row.ctpp_id.to_string(),
        quote(&row.ctpp_pt),
        row.artg_id.clone(),
        row.tpp_id.to_string(),
        quote(&row.tpp_pt),
        row.tpuu_id.to_string(),
        quote(&row.tpuu_pt),
        row.tpp_tp_id.to_string(),
        quote(&row.tpp_tp_pt),
        row.tpuu_tp_id.to_string(),
        quote(&row.tpuu_tp_pt),
        row.mpp_id.map(|id| id.to_string()).unwrap_or_default(),
        quote(&row.mpp_pt),
        row.mpuu_id.to_string(),
        quote(&row.mpuu_pt),
        row.mp_id.to_string(),
        quote(&row.mp_pt),
    ]
}

/// Writes a header and records to `out`.
pub fn write_records<W, I, R>(
    out: &mut W,
    format: FileFormat,
    header: &[&str],
    records: I,
) -> std::io::Result<usize>
where
    W: Write,
    I: IntoIterator<Item = R>,
    R: AsRef<[String]>,
{
    let delimiter = format.delimiter();
    write!(out, "{}{LINE_END}", header.join(delimiter))?;
    let mut count = 0;
    for record in records {
        write!(out, "{}{LINE_END}", record.as_ref().join(delimiter))?;
        count += 1;
    }
    Ok(count)
}

fn write_file<I, R>(
    path: &Path,
    format: FileFormat,
    header: &[&str],
    records: I,
) -> FlatFileResult<usize>
where
    I: IntoIterator<Item = R>,
    R: AsRef<[String]>,
{
    validate_output(path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| FlatFileError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| FlatFileError::io(path, e))?;
    let mut out = BufWriter::new(file);
    let count = write_records(&mut out, format, header, records)
        .and_then(|count| out.flush().map(|_| count))
        .map_err(|e| FlatFileError::io(path, e))?;
    info!(path = %path.display(), rows = count, "Wrote {format} file");
    Ok(count)
}

/// Writes flat rows to `<base>.<ext>` and returns the path written.
pub fn write_flat_file(
    rows: &[FlatRow],
    base: &Path,
    format: FileFormat,
) -> FlatFileResult<PathBuf> {
    let path = format.file_path(base);
    write_file(&path, format, &FLAT_FILE_HEADER, rows.iter().map(flat_record))?;
    Ok(path)
}

/// Writes the replacement table to `<base>.<ext>` and returns the path written.
pub fn write_replacements(
    ctx: &ReleaseContext,
    base: &Path,
    format: FileFormat,
) -> FlatFileResult<PathBuf> {
    let path = format.file_path(base);
    let records = ctx.replacements().entries().iter().map(|r| {
        [
            r.inactive_id.to_string(),
            quote(ctx.pt(r.inactive_id)),
            r.replacement_type_id.to_string(),
            quote(ctx.pt(r.replacement_type_id)),
            r.replacement_id.to_string(),
            quote(ctx.pt(r.replacement_id)),
            r.date_string(),
        ]
    });
    write_file(&path, format, &REPLACEMENT_HEADER, records)?;
    Ok(path)
}
