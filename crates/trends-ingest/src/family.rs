// Dataset families and their per-family configuration
//
// Every dataset produced by a run belongs to exactly one family. The family
// decides how the dataset is cleaned, how its staged files are named and
// which table it is appended to.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trends_common::{Result, TrendsError};

/// Name of the column stamped with the run timestamp
pub const SOURCE_DATE_COLUMN: &str = "source_date";

/// Column storage type in the destination table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer => "BIGINT",
            ColumnType::Text => "TEXT",
        }
    }
}

/// One column of a family schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub column_type: ColumnType,
}

const fn int(name: &'static str) -> Column {
    Column { name, column_type: ColumnType::Integer }
}

const fn text(name: &'static str) -> Column {
    Column { name, column_type: ColumnType::Text }
}

/// Static configuration carried by each family
#[derive(Debug)]
pub struct FamilySpec {
    /// Textual columns folded to lowercase during cleaning
    pub lowercase_columns: &'static [&'static str],
    /// Whether rows get a `source_date` column
    pub stamp_source_date: bool,
    /// Whether `song_name` is cut at feature markers
    pub clean_song_names: bool,
    /// Record columns in staging order, excluding `source_date`
    pub columns: &'static [Column],
    /// Destination table used when no override is configured ("" = not loaded)
    pub default_table: &'static str,
}

static BILLBOARD: FamilySpec = FamilySpec {
    lowercase_columns: &["title", "artist"],
    stamp_source_date: true,
    clean_song_names: false,
    columns: &[int("position"), text("title"), text("artist")],
    default_table: "",
};

static DJ_MAG: FamilySpec = FamilySpec {
    lowercase_columns: &["artist"],
    stamp_source_date: true,
    clean_song_names: false,
    columns: &[int("position"), text("artist")],
    default_table: "",
};

static SPOTIFY: FamilySpec = FamilySpec {
    lowercase_columns: &["all_artists", "song_name"],
    stamp_source_date: true,
    clean_song_names: true,
    columns: &[
        int("position"),
        text("song_name"),
        text("main_artist"),
        text("main_artist_id"),
        text("all_artists"),
        text("all_artist_ids"),
        text("release_date"),
        int("duration_ms"),
        int("popularity"),
        text("playlist_id"),
    ],
    default_table: "spotify_data_table",
};

static PLAYLISTS: FamilySpec = FamilySpec {
    lowercase_columns: &[],
    stamp_source_date: true,
    clean_song_names: false,
    columns: &[text("playlist_name"), text("playlist_id"), int("track_count")],
    default_table: "playlists_table",
};

static ARTISTS: FamilySpec = FamilySpec {
    lowercase_columns: &["name", "genre_1", "genre_2", "genre_3"],
    stamp_source_date: false,
    clean_song_names: false,
    columns: &[
        text("artist_id"),
        text("name"),
        text("genre_1"),
        text("genre_2"),
        text("genre_3"),
    ],
    default_table: "artists_table",
};

/// Dataset family
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Billboard,
    DjMag,
    Spotify,
    Playlists,
    Artists,
}

impl Family {
    pub const ALL: [Family; 5] = [
        Family::Billboard,
        Family::DjMag,
        Family::Spotify,
        Family::Playlists,
        Family::Artists,
    ];

    /// Source name used in staged file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Billboard => "billboard",
            Family::DjMag => "dj_mag",
            Family::Spotify => "spotify",
            Family::Playlists => "playlists",
            Family::Artists => "artists",
        }
    }

    pub fn spec(&self) -> &'static FamilySpec {
        match self {
            Family::Billboard => &BILLBOARD,
            Family::DjMag => &DJ_MAG,
            Family::Spotify => &SPOTIFY,
            Family::Playlists => &PLAYLISTS,
            Family::Artists => &ARTISTS,
        }
    }

    /// Full table schema: record columns plus `source_date` when stamped
    pub fn schema(&self) -> Vec<Column> {
        let spec = self.spec();
        let mut columns = spec.columns.to_vec();
        if spec.stamp_source_date {
            columns.push(text(SOURCE_DATE_COLUMN));
        }
        columns
    }

    pub fn column(&self, name: &str) -> Option<Column> {
        self.schema().into_iter().find(|c| c.name == name)
    }

    /// Prefix shared by every staged file of this family
    pub fn file_prefix(&self) -> String {
        format!("{}_", self.as_str())
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Family {
    type Err = TrendsError;

    fn from_str(s: &str) -> Result<Self> {
        Family::ALL
            .into_iter()
            .find(|family| family.as_str() == s || (s == "djmag" && *family == Family::DjMag))
            .ok_or_else(|| TrendsError::config(format!("Unknown dataset family: {}", s)))
    }
}

/// Family -> destination table lookup handed to the loader and the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationTables {
    tables: BTreeMap<Family, String>,
}

impl Default for DestinationTables {
    fn default() -> Self {
        Self {
            tables: Family::ALL
                .into_iter()
                .map(|family| (family, family.spec().default_table.to_string()))
                .collect(),
        }
    }
}

impl DestinationTables {
    /// Override one family's destination ("" disables loading it)
    pub fn with_table(mut self, family: Family, table: impl Into<String>) -> Self {
        self.tables.insert(family, table.into());
        self
    }

    /// Destination table, `None` when the family is not loaded
    pub fn table_for(&self, family: Family) -> Option<&str> {
        self.tables
            .get(&family)
            .map(String::as_str)
            .filter(|table| !table.is_empty())
    }

    /// Families that have a destination table
    pub fn loaded_families(&self) -> impl Iterator<Item = (Family, &str)> {
        Family::ALL
            .into_iter()
            .filter_map(move |family| self.table_for(family).map(|table| (family, table)))
    }

    pub fn validate(&self) -> Result<()> {
        for (_, table) in self.loaded_families() {
            validate_identifier(table)?;
        }
        if self.table_for(Family::Artists).is_none() {
            return Err(TrendsError::config(
                "the artists family needs a destination table for known-artist lookups",
            ));
        }
        Ok(())
    }
}

/// Accept `[A-Za-z_][A-Za-z0-9_]*` only; identifiers are spliced into SQL
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(TrendsError::config(format!("Invalid SQL identifier: '{}'", name)))
    }
}
