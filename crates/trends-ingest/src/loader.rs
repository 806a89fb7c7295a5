// Staged file loader
//
// Appends staged CSV files into their family's destination table. Families
// load independently: the outcome of each is reported and a failure never
// stops the others.

use std::fmt;
use std::path::Path;
use tracing::{debug, error, info};
use trends_common::{Result, TrendsError};

use crate::family::{ColumnType, Family};
use crate::staging::{read_staged, StagingWriter};
use crate::store::{SqlValue, Store};

/// Which staged files of a family to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadScope {
    /// Every staged file of the family
    All,
    /// Only the files of one run (compact `YYYYMMDDHHMMSS` timestamp)
    Run(String),
}

/// Result of loading one family
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded { files: usize, rows: u64 },
    /// No destination table configured
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyLoadOutcome {
    pub family: Family,
    pub status: LoadStatus,
}

impl FamilyLoadOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, LoadStatus::Failed(_))
    }
}

impl fmt::Display for FamilyLoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            LoadStatus::Loaded { files, rows } => {
                write!(f, "{}: loaded {} rows from {} files", self.family, rows, files)
            }
            LoadStatus::Skipped => write!(f, "{}: skipped (no destination)", self.family),
            LoadStatus::Failed(reason) => write!(f, "{}: failed: {}", self.family, reason),
        }
    }
}

/// Loads staged files into the store
pub struct Loader<'a> {
    store: &'a Store,
    staging: StagingWriter,
}

impl<'a> Loader<'a> {
    pub fn new(store: &'a Store, staging: StagingWriter) -> Self {
        Self { store, staging }
    }

    /// Load one family, folding any error into the outcome
    pub async fn load_family(&self, family: Family, scope: &LoadScope) -> FamilyLoadOutcome {
        let status = match self.try_load_family(family, scope).await {
            Ok(Some((files, rows))) => {
                info!(%family, files, rows, "Family loaded");
                LoadStatus::Loaded { files, rows }
            }
            Ok(None) => {
                info!(%family, "No destination table, skipping load");
                LoadStatus::Skipped
            }
            Err(e) => {
                error!(%family, error = %e, "Family load failed");
                LoadStatus::Failed(e.to_string())
            }
        };

        FamilyLoadOutcome { family, status }
    }

    /// Load every family in `Family::ALL` order
    pub async fn load_all(&self, scope: &LoadScope) -> Vec<FamilyLoadOutcome> {
        let mut outcomes = Vec::with_capacity(Family::ALL.len());
        for family in Family::ALL {
            outcomes.push(self.load_family(family, scope).await);
        }
        outcomes
    }

    async fn try_load_family(&self, family: Family, scope: &LoadScope) -> Result<Option<(usize, u64)>> {
        let Some(table) = self.store.destinations().table_for(family) else {
            return Ok(None);
        };

        let run = match scope {
            LoadScope::All => None,
            LoadScope::Run(ts) => Some(ts.as_str()),
        };
        let files = self.staging.list_family(family, run)?;
        if files.is_empty() {
            info!(%family, "No staged files to load");
        }

        // every file is converted before the first append
        let converted = files
            .iter()
            .map(|path| typed_rows(family, path).map(|rows| (path, rows)))
            .collect::<Result<Vec<_>>>()?;

        // one transaction per family: a failed file leaves the table untouched
        let mut tx = self.store.begin().await?;
        let mut rows_written = 0u64;
        for (path, (columns, rows)) in &converted {
            let written = self.store.append_rows_in(&mut tx, table, columns, rows).await?;
            debug!(%family, table, rows = written, "Appended {}", path.display());
            rows_written += written;
        }
        self.store.commit(tx).await?;

        Ok(Some((files.len(), rows_written)))
    }
}

/// Read a staged file and convert its cells using the family schema
fn typed_rows(family: Family, path: &Path) -> Result<(Vec<String>, Vec<Vec<SqlValue>>)> {
    let (header, raw_rows) = read_staged(path)?;

    let column_types = header
        .iter()
        .map(|name| {
            family.column(name).map(|c| c.column_type).ok_or_else(|| {
                TrendsError::staging(format!(
                    "{}: column '{}' is not part of the {} schema",
                    path.display(),
                    name,
                    family
                ))
            })
        })
        .collect::<Result<Vec<ColumnType>>>()?;

    let rows = raw_rows
        .into_iter()
        .enumerate()
        .map(|(line, row)| {
            row.into_iter()
                .zip(&column_types)
                .map(|(cell, column_type)| to_sql_value(cell, *column_type))
                .collect::<Result<Vec<SqlValue>>>()
                .map_err(|e| TrendsError::staging(format!("{} row {}: {}", path.display(), line + 1, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((header, rows))
}

fn to_sql_value(cell: String, column_type: ColumnType) -> Result<SqlValue> {
    match column_type {
        ColumnType::Text => Ok(SqlValue::Text(cell)),
        ColumnType::Integer if cell.trim().is_empty() => Ok(SqlValue::Null),
        ColumnType::Integer => cell
            .trim()
            .parse::<i64>()
            .map(SqlValue::Integer)
            .map_err(|_| TrendsError::staging(format!("'{}' is not an integer", cell))),
    }
}
