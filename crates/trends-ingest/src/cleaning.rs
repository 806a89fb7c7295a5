// Cleaning stage
//
// Per-family normalization driven by `FamilySpec`: lowercase configured
// columns, cut feature markers out of song names and stamp `source_date`.

use tracing::{debug, info};

use crate::dataset::Dataset;
use crate::family::SOURCE_DATE_COLUMN;
use crate::pipeline::RunContext;

/// Markers that introduce featured artists in a song title
const FEATURE_MARKERS: [&str; 2] = [" (feat.", " (with"];

/// Cut a song name at the earliest feature marker
///
/// ```
/// use trends_ingest::cleaning::clean_music_name;
///
/// assert_eq!(clean_music_name("Title (feat. X)"), "Title");
/// assert_eq!(clean_music_name("Plain Title"), "Plain Title");
/// ```
pub fn clean_music_name(name: &str) -> &str {
    FEATURE_MARKERS
        .iter()
        .filter_map(|marker| name.find(marker))
        .min()
        .map_or(name, |cut| &name[..cut])
}

/// Clean one dataset in place
///
/// Returns `false` when the dataset is empty and must be skipped.
pub fn clean_dataset(dataset: &mut Dataset, ctx: &RunContext) -> bool {
    if dataset.is_empty() {
        debug!(family = %dataset.family, detail = %dataset.detail, "Skipping empty dataset");
        return false;
    }

    let spec = dataset.family.spec();

    if spec.clean_song_names {
        if let Some(index) = dataset.column_index("song_name") {
            for row in &mut dataset.rows {
                if let Some(cell) = row.get_mut(index) {
                    let cleaned = clean_music_name(cell).to_string();
                    *cell = cleaned;
                }
            }
        }
    }

    for column in spec.lowercase_columns {
        let Some(index) = dataset.column_index(column) else {
            continue;
        };
        for row in &mut dataset.rows {
            if let Some(cell) = row.get_mut(index) {
                *cell = cell.to_lowercase();
            }
        }
    }

    if spec.stamp_source_date && dataset.column_index(SOURCE_DATE_COLUMN).is_none() {
        let stamp = ctx.stamp();
        dataset.columns.push(SOURCE_DATE_COLUMN.to_string());
        for row in &mut dataset.rows {
            row.push(stamp.clone());
        }
    }

    true
}

/// Clean every dataset of a run, dropping the empty ones
pub fn clean_datasets(datasets: Vec<Dataset>, ctx: &RunContext) -> Vec<Dataset> {
    let total = datasets.len();

    let cleaned: Vec<Dataset> = datasets
        .into_iter()
        .filter_map(|mut dataset| clean_dataset(&mut dataset, ctx).then_some(dataset))
        .collect();

    info!(
        "Cleaned {} datasets ({} skipped as empty)",
        cleaned.len(),
        total - cleaned.len()
    );

    cleaned
}
