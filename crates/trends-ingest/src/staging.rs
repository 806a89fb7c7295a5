// CSV staging area
//
// One file per cleaned dataset:
//   {staging_dir}/{source_name}_{source_detail}_{YYYYMMDDHHMMSS}.csv
//
// Files are created with create-new semantics so a staged file is never
// overwritten; the loader only ever reads them.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use trends_common::{Result, TrendsError};

use crate::dataset::Dataset;
use crate::family::Family;
use crate::pipeline::RunContext;

/// A dataset written to the staging area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub family: Family,
    pub detail: String,
    /// Compact run timestamp (`YYYYMMDDHHMMSS`)
    pub run_timestamp: String,
    pub path: PathBuf,
    pub rows: usize,
}

/// Staged file name for one dataset of one run
pub fn staged_file_name(family: Family, detail: &str, run_timestamp: &str) -> String {
    format!("{}_{}_{}.csv", family.as_str(), detail, run_timestamp)
}

/// Writes cleaned datasets into the staging directory
#[derive(Debug, Clone)]
pub struct StagingWriter {
    dir: PathBuf,
}

impl StagingWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one dataset; empty datasets produce no file
    pub fn stage(&self, dataset: &Dataset, ctx: &RunContext) -> Result<Option<StagedFile>> {
        if dataset.is_empty() {
            debug!(family = %dataset.family, detail = %dataset.detail, "Nothing to stage");
            return Ok(None);
        }

        std::fs::create_dir_all(&self.dir).map_err(|e| {
            TrendsError::staging(format!(
                "Failed to create staging directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let run_timestamp = ctx.compact();
        let path = self
            .dir
            .join(staged_file_name(dataset.family, &dataset.detail, &run_timestamp));

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| TrendsError::staging(format!("Failed to create {}: {}", path.display(), e)))?;

        // a file this call created is never left half written
        if let Err(e) = write_csv(file, dataset, &path) {
            remove_staged(&path);
            return Err(e);
        }

        info!(
            family = %dataset.family,
            detail = %dataset.detail,
            rows = dataset.len(),
            "Staged {}",
            path.display()
        );

        Ok(Some(StagedFile {
            family: dataset.family,
            detail: dataset.detail.clone(),
            run_timestamp,
            path,
            rows: dataset.len(),
        }))
    }

    /// Stage every dataset in order, stopping at the first failure
    ///
    /// On failure the files already written by this call are removed, so a
    /// failed run leaves nothing behind for a later load.
    pub fn stage_all(&self, datasets: &[Dataset], ctx: &RunContext) -> Result<Vec<StagedFile>> {
        let mut staged = Vec::with_capacity(datasets.len());
        for dataset in datasets {
            match self.stage(dataset, ctx) {
                Ok(Some(file)) => staged.push(file),
                Ok(None) => {}
                Err(e) => {
                    warn!(removed = staged.len(), "Staging failed, removing files of this run");
                    for file in &staged {
                        remove_staged(&file.path);
                    }
                    return Err(e);
                }
            }
        }
        Ok(staged)
    }

    /// Staged files of one family, sorted by name
    ///
    /// With `run_timestamp`, only that run's files are returned. A missing
    /// staging directory simply has no files.
    pub fn list_family(&self, family: Family, run_timestamp: Option<&str>) -> Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(TrendsError::staging(format!(
                    "Failed to list {}: {}",
                    self.dir.display(),
                    e
                )))
            }
        };

        let prefix = family.file_prefix();
        let suffix = run_timestamp.map(|ts| format!("_{}.csv", ts));

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.starts_with(&prefix) || !name.ends_with(".csv") {
                continue;
            }
            if let Some(ref suffix) = suffix {
                if !name.ends_with(suffix.as_str()) {
                    continue;
                }
            }
            files.push(path);
        }

        files.sort();
        Ok(files)
    }
}

fn write_csv(file: std::fs::File, dataset: &Dataset, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_writer(file);
    writer
        .write_record(&dataset.columns)
        .map_err(|e| TrendsError::staging(format!("Failed to write {}: {}", path.display(), e)))?;
    for row in &dataset.rows {
        writer
            .write_record(row)
            .map_err(|e| TrendsError::staging(format!("Failed to write {}: {}", path.display(), e)))?;
    }
    writer
        .flush()
        .map_err(|e| TrendsError::staging(format!("Failed to flush {}: {}", path.display(), e)))
}

fn remove_staged(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(error = %e, "Failed to remove {}", path.display());
    }
}

/// Read a staged file back as `(header, rows)`
pub fn read_staged(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| TrendsError::staging(format!("Failed to open {}: {}", path.display(), e)))?;

    let header = reader
        .headers()
        .map_err(|e| TrendsError::staging(format!("Failed to read header of {}: {}", path.display(), e)))?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| TrendsError::staging(format!("Failed to read {}: {}", path.display(), e)))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok((header, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn ctx(second: u32) -> RunContext {
        RunContext::at(Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, second).unwrap())
    }

    fn dataset(family: Family, detail: &str, rows: usize) -> Dataset {
        let mut dataset = Dataset::new(family, detail);
        let width = dataset.columns.len();
        for i in 0..rows {
            dataset.rows.push((0..width).map(|c| format!("{}-{}", i, c)).collect());
        }
        dataset
    }

    #[test]
    fn test_file_naming() {
        assert_eq!(
            staged_file_name(Family::Billboard, "hot_100", "20240305140709"),
            "billboard_hot_100_20240305140709.csv"
        );
    }

    #[test]
    fn test_stage_writes_header_and_rows() {
        let tmp = TempDir::new().unwrap();
        let writer = StagingWriter::new(tmp.path().join("nested"));

        let staged = writer
            .stage(&dataset(Family::DjMag, "top100djs", 3), &ctx(9))
            .unwrap()
            .unwrap();

        assert_eq!(staged.run_timestamp, "20240305140709");
        assert!(staged.path.ends_with("dj_mag_top100djs_20240305140709.csv"));

        let (header, rows) = read_staged(&staged.path).unwrap();
        assert_eq!(header, vec!["position", "artist"]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], vec!["2-0", "2-1"]);
    }

    #[test]
    fn test_empty_dataset_produces_no_file() {
        let tmp = TempDir::new().unwrap();
        let writer = StagingWriter::new(tmp.path());

        let staged = writer.stage(&dataset(Family::Billboard, "hot_100", 0), &ctx(9)).unwrap();
        assert!(staged.is_none());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_existing_file_is_never_overwritten() {
        let tmp = TempDir::new().unwrap();
        let writer = StagingWriter::new(tmp.path());
        let data = dataset(Family::Artists, "catalogue", 1);

        writer.stage(&data, &ctx(9)).unwrap();
        let err = writer.stage(&data, &ctx(9)).unwrap_err();
        assert!(matches!(err, TrendsError::Staging(_)));
    }

    #[test]
    fn test_failed_stage_all_removes_run_files() {
        let tmp = TempDir::new().unwrap();
        let writer = StagingWriter::new(tmp.path());

        let datasets = vec![
            dataset(Family::Billboard, "hot_100", 2),
            dataset(Family::Spotify, "global", 1),
            dataset(Family::Spotify, "global", 1),
        ];

        let err = writer.stage_all(&datasets, &ctx(9)).unwrap_err();
        assert!(matches!(err, TrendsError::Staging(_)));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_stage_all_keeps_files_it_did_not_write() {
        let tmp = TempDir::new().unwrap();
        let writer = StagingWriter::new(tmp.path());

        let earlier = writer
            .stage(&dataset(Family::Spotify, "global", 1), &ctx(9))
            .unwrap()
            .unwrap();

        let datasets = vec![
            dataset(Family::Billboard, "hot_100", 2),
            dataset(Family::Spotify, "global", 1),
        ];
        assert!(writer.stage_all(&datasets, &ctx(9)).is_err());

        assert!(earlier.path.exists());
        assert!(writer.list_family(Family::Billboard, None).unwrap().is_empty());
    }

    #[test]
    fn test_list_family_by_prefix_and_run() {
        let tmp = TempDir::new().unwrap();
        let writer = StagingWriter::new(tmp.path());

        writer.stage(&dataset(Family::Spotify, "global", 1), &ctx(1)).unwrap();
        writer.stage(&dataset(Family::Spotify, "usa", 1), &ctx(1)).unwrap();
        writer.stage(&dataset(Family::Spotify, "global", 1), &ctx(2)).unwrap();
        writer.stage(&dataset(Family::Playlists, "tracked", 1), &ctx(1)).unwrap();

        let all = writer.list_family(Family::Spotify, None).unwrap();
        assert_eq!(all.len(), 3);

        let one_run = writer.list_family(Family::Spotify, Some("20240305140702")).unwrap();
        assert_eq!(one_run.len(), 1);

        let playlists = writer.list_family(Family::Playlists, None).unwrap();
        assert_eq!(playlists.len(), 1);
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let writer = StagingWriter::new(tmp.path().join("absent"));
        assert!(writer.list_family(Family::Artists, None).unwrap().is_empty());
    }
}
