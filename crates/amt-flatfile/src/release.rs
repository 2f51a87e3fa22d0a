//! Release discovery and row reading.
//!
//! A release is either an extracted RF2 directory or a zip archive. Files
//! are recognised by their RF2 naming convention; only snapshot files are
//! used.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use amt_types::rf2::split_row;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::{FlatFileError, FlatFileResult};

/// Largest release archive accepted, 1.5 GB.
pub const MAX_ARCHIVE_SIZE: u64 = 1_500_000_000;

const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

const PRODUCT_REFSET_NAMES: [&str; 8] = [
    "CTPP", "TPP", "TPUU", "TP", "MPP", "MPUU", "MP", "Simple",
];

/// Kind of release file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReleaseFileKind {
    /// `sct2_Concept_Snapshot`.
    Concept,
    /// `sct2_Relationship_Snapshot` (inferred relationships only).
    Relationship,
    /// `der2_cRefset_LanguageSnapshot`.
    Language,
    /// `sct2_Description_Snapshot`.
    Description,
    /// ARTG id string refset.
    ArtgId,
    /// Product-model simple refset.
    ProductRefset,
    /// Historical association refset.
    Association,
}

impl ReleaseFileKind {
    /// Recognises a file by its name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        if !name.ends_with(".txt") {
            return None;
        }
        if name.starts_with("sct2_Concept_Snapshot") {
            Some(ReleaseFileKind::Concept)
        } else if name.starts_with("sct2_Relationship_Snapshot") {
            Some(ReleaseFileKind::Relationship)
        } else if name.starts_with("sct2_Description_Snapshot") {
            Some(ReleaseFileKind::Description)
        } else if name.starts_with("der2_cRefset_LanguageSnapshot") {
            Some(ReleaseFileKind::Language)
        } else if name.contains("ARTGId") && name.contains("Snapshot") {
            Some(ReleaseFileKind::ArtgId)
        } else if name.starts_with("der2_cRefset_Association") && name.contains("Snapshot") {
            Some(ReleaseFileKind::Association)
        } else if let Some(rest) = name.strip_prefix("der2_Refset_") {
            PRODUCT_REFSET_NAMES
                .iter()
                .any(|kind| {
                    rest.strip_prefix(kind)
                        .is_some_and(|r| r.starts_with("Snapshot"))
                })
                .then_some(ReleaseFileKind::ProductRefset)
        } else {
            None
        }
    }

    /// Human readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            ReleaseFileKind::Concept => "concept",
            ReleaseFileKind::Relationship => "relationship",
            ReleaseFileKind::Language => "language refset",
            ReleaseFileKind::Description => "description",
            ReleaseFileKind::ArtgId => "ARTG id refset",
            ReleaseFileKind::ProductRefset => "product-model refset",
            ReleaseFileKind::Association => "historical association refset",
        }
    }
}

/// Where a release file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Path(PathBuf),
    ArchiveEntry(String),
}

/// A discovered release file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFile {
    /// File kind.
    pub kind: ReleaseFileKind,
    /// File name without directories.
    pub name: String,
    location: Location,
}

/// The release files needed for generation, grouped by kind.
#[derive(Debug, Clone, Default)]
pub struct ReleaseFiles {
    /// Concept file.
    pub concept: Option<ReleaseFile>,
    /// Inferred relationship file.
    pub relationship: Option<ReleaseFile>,
    /// Language refset file.
    pub language: Option<ReleaseFile>,
    /// Description file.
    pub description: Option<ReleaseFile>,
    /// ARTG id refset file.
    pub artg_id: Option<ReleaseFile>,
    /// Product-model refset files in name order.
    pub product_refsets: Vec<ReleaseFile>,
    /// Historical association refset files in name order.
    pub associations: Vec<ReleaseFile>,
}

impl ReleaseFiles {
    fn add(&mut self, file: ReleaseFile) {
        let slot = match file.kind {
            ReleaseFileKind::Concept => &mut self.concept,
            ReleaseFileKind::Relationship => &mut self.relationship,
            ReleaseFileKind::Language => &mut self.language,
            ReleaseFileKind::Description => &mut self.description,
            ReleaseFileKind::ArtgId => &mut self.artg_id,
            ReleaseFileKind::ProductRefset => {
                self.product_refsets.push(file);
                return;
            }
            ReleaseFileKind::Association => {
                self.associations.push(file);
                return;
            }
        };
        match slot {
            Some(existing) => warn!(
                kind = file.kind.as_str(),
                kept = %existing.name,
                ignored = %file.name,
                "Release contains more than one file of a kind"
            ),
            None => *slot = Some(file),
        }
    }

    /// Checks that every mandatory file was found.
    pub fn ensure_complete(&self) -> FlatFileResult<()> {
        let mandatory = [
            (&self.concept, ReleaseFileKind::Concept),
            (&self.relationship, ReleaseFileKind::Relationship),
            (&self.language, ReleaseFileKind::Language),
            (&self.description, ReleaseFileKind::Description),
            (&self.artg_id, ReleaseFileKind::ArtgId),
        ];
        for (file, kind) in mandatory {
            if file.is_none() {
                return Err(FlatFileError::MissingReleaseFile(kind.as_str()));
            }
        }
        if self.product_refsets.is_empty() {
            return Err(FlatFileError::MissingReleaseFile(
                ReleaseFileKind::ProductRefset.as_str(),
            ));
        }
        Ok(())
    }
}

/// An opened release.
#[derive(Debug, Clone)]
pub struct Release {
    root: PathBuf,
    archive: bool,
    files: ReleaseFiles,
}

impl Release {
    /// Validates the input path and discovers the release files in it.
    pub fn open(path: impl AsRef<Path>) -> FlatFileResult<Self> {
        let path = path.as_ref();
        let archive = validate_input(path)?;

        let mut found = if archive {
            discover_archive(path)?
        } else {
            discover_directory(path)
        };
        found.sort_by(|a, b| a.name.cmp(&b.name));

        let mut files = ReleaseFiles::default();
        for file in found {
            debug!(kind = file.kind.as_str(), name = %file.name, "Found release file");
            files.add(file);
        }
        files.ensure_complete()?;

        info!(
            input = %path.display(),
            product_refsets = files.product_refsets.len(),
            associations = files.associations.len(),
            "Discovered release files"
        );
        Ok(Self {
            root: path.to_path_buf(),
            archive,
            files,
        })
    }

    /// The discovered files.
    pub fn files(&self) -> &ReleaseFiles {
        &self.files
    }

    /// Returns true if the release is a zip archive.
    pub fn is_archive(&self) -> bool {
        self.archive
    }

    /// Streams the rows of a file, header excluded, as pre-split fields.
    ///
    /// The callback receives the one-based line number and the fields.
    /// Returns the number of rows passed to the callback.
    pub fn for_each_row<F>(&self, file: &ReleaseFile, on_row: F) -> FlatFileResult<usize>
    where
        F: FnMut(usize, &[&str]) -> FlatFileResult<()>,
    {
        match &file.location {
            Location::Path(path) => {
                let reader = File::open(path).map_err(|e| FlatFileError::io(path, e))?;
                read_rows(BufReader::new(reader), path, on_row)
            }
            Location::ArchiveEntry(name) => {
                let archive_file =
                    File::open(&self.root).map_err(|e| FlatFileError::io(&self.root, e))?;
                let mut archive = ZipArchive::new(archive_file)?;
                let entry = archive.by_name(name)?;
                read_rows(BufReader::new(entry), &self.root.join(name), on_row)
            }
        }
    }
}

fn read_rows<R, F>(mut reader: R, path: &Path, mut on_row: F) -> FlatFileResult<usize>
where
    R: BufRead,
    F: FnMut(usize, &[&str]) -> FlatFileResult<()>,
{
    let mut line = String::new();
    let mut line_no = 0;
    let mut rows = 0;
    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .map_err(|e| FlatFileError::io(path, e))?;
        if read == 0 {
            break;
        }
        line_no += 1;
        if line_no == 1 || line.trim_end().is_empty() {
            continue;
        }
        let fields = split_row(&line);
        on_row(line_no, &fields)?;
        rows += 1;
    }
    Ok(rows)
}

/// Validates the input path. Returns true if it is a zip archive.
pub fn validate_input(path: &Path) -> FlatFileResult<bool> {
    let invalid = |reason: &str| FlatFileError::InvalidInput {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(invalid("does not exist"));
        }
        Err(e) => return Err(FlatFileError::io(path, e)),
    };

    if metadata.file_type().is_symlink() {
        return Err(invalid("must not be a symlink"));
    }
    if metadata.is_dir() {
        return Ok(false);
    }
    if !metadata.is_file() {
        return Err(invalid("must be a regular file or a directory"));
    }
    if metadata.len() > MAX_ARCHIVE_SIZE {
        return Err(invalid(&format!(
            "archives over 1.5GB are not accepted, file size was {}",
            metadata.len()
        )));
    }

    let mut magic = [0u8; 4];
    let mut file = File::open(path).map_err(|e| FlatFileError::io(path, e))?;
    if file.read_exact(&mut magic).is_err() || magic != ZIP_MAGIC {
        return Err(invalid("is not a zip archive"));
    }
    Ok(true)
}

fn discover_directory(root: &Path) -> Vec<ReleaseFile> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            let kind = ReleaseFileKind::from_file_name(&name)?;
            Some(ReleaseFile {
                kind,
                name,
                location: Location::Path(entry.into_path()),
            })
        })
        .collect()
}

fn discover_archive(path: &Path) -> FlatFileResult<Vec<ReleaseFile>> {
    let file = File::open(path).map_err(|e| FlatFileError::io(path, e))?;
    let archive = ZipArchive::new(file)?;

    let found = archive
        .file_names()
        .filter(|entry| !entry.ends_with('/'))
        .filter_map(|entry| {
            let name = entry.rsplit('/').next()?.to_string();
            let kind = ReleaseFileKind::from_file_name(&name)?;
            Some(ReleaseFile {
                kind,
                name,
                location: Location::ArchiveEntry(entry.to_string()),
            })
        })
        .collect();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_kind_recognition() {
        let cases = [
            ("sct2_Concept_Snapshot_AU1000036_20240131.txt", Some(ReleaseFileKind::Concept)),
            ("sct2_Relationship_Snapshot_AU1000036_20240131.txt", Some(ReleaseFileKind::Relationship)),
            ("sct2_StatedRelationship_Snapshot_AU1000036_20240131.txt", None),
            ("sct2_RelationshipConcreteValues_Snapshot_AU1000036_20240131.txt", None),
            ("sct2_Description_Snapshot-en-AU_AU1000036_20240131.txt", Some(ReleaseFileKind::Description)),
            ("der2_cRefset_LanguageSnapshot-en-AU_AU1000036_20240131.txt", Some(ReleaseFileKind::Language)),
            ("der2_iisssccRefset_ARTGIdSnapshot_AU1000036_20240131.txt", Some(ReleaseFileKind::ArtgId)),
            ("der2_Refset_SimpleSnapshot_AU1000036_20240131.txt", Some(ReleaseFileKind::ProductRefset)),
            ("der2_Refset_TPSnapshot_AU1000036_20240131.txt", Some(ReleaseFileKind::ProductRefset)),
            ("der2_Refset_TPUUSnapshot_AU1000036_20240131.txt", Some(ReleaseFileKind::ProductRefset)),
            ("der2_cRefset_AssociationSnapshot_AU1000036_20240131.txt", Some(ReleaseFileKind::Association)),
            ("der2_Refset_SimpleFull_AU1000036_20240131.txt", None),
            ("sct2_Concept_Full_AU1000036_20240131.txt", None),
            ("sct2_Concept_Snapshot_AU1000036_20240131.csv", None),
        ];
        for (name, expected) in cases {
            assert_eq!(ReleaseFileKind::from_file_name(name), expected, "{name}");
        }
    }

    #[test]
    fn test_read_rows_skips_header_and_blank_lines() {
        let data = "id\teffectiveTime\tactive\r\n1\t20240131\t1\r\n\r\n2\t20240131\t0\t\r\n";
        let mut seen = Vec::new();
        let rows = read_rows(data.as_bytes(), Path::new("test.txt"), |line, fields| {
            seen.push((line, fields.iter().map(|f| f.to_string()).collect::<Vec<_>>()));
            Ok(())
        })
        .unwrap();

        assert_eq!(rows, 2);
        assert_eq!(seen[0].0, 2);
        assert_eq!(seen[0].1, vec!["1", "20240131", "1"]);
        assert_eq!(seen[1].0, 4);
        assert_eq!(seen[1].1, vec!["2", "20240131", "0", ""]);
    }

    #[test]
    fn test_validate_input_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_input(&dir.path().join("missing.zip")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_validate_input_directory_and_non_zip() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!validate_input(dir.path()).unwrap());

        let path = dir.path().join("release.zip");
        fs::File::create(&path).unwrap().write_all(b"not a zip").unwrap();
        let err = validate_input(&path).unwrap_err();
        assert!(err.to_string().contains("is not a zip archive"));
    }

    #[test]
    fn test_validate_input_rejects_archive_over_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release.zip");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(&ZIP_MAGIC).unwrap();
        file.set_len(1_500_000_001).unwrap();

        let err = validate_input(&path).unwrap_err();
        assert!(err.to_string().contains("over 1.5GB"), "{err}");
        assert!(err.to_string().contains("1500000001"));
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_input_rejects_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        fs::create_dir(&target).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let err = validate_input(&link).unwrap_err();
        assert!(err.to_string().contains("symlink"));
    }

    #[test]
    fn test_ensure_complete_reports_first_missing_file() {
        let files = ReleaseFiles::default();
        let err = files.ensure_complete().unwrap_err();
        assert!(matches!(err, FlatFileError::MissingReleaseFile("concept")));
    }
}
