//! Staging and loading against an in-memory SQLite store

mod common;

use common::*;
use tempfile::TempDir;
use trends_ingest::cleaning::clean_datasets;
use trends_ingest::dataset::TrackedPlaylist;
use trends_ingest::models::{Artist, PlaylistTrack};
use trends_ingest::{Dataset, Family, LoadScope, LoadStatus, Loader, StagingWriter, Store};

fn track(position: u32, song: &str, artist_ids: &[&str]) -> PlaylistTrack {
    PlaylistTrack {
        position,
        song_name: song.to_string(),
        main_artist: "Main".to_string(),
        main_artist_id: artist_ids[0].to_string(),
        all_artists: artist_ids.iter().map(|id| format!("Name {}", id)).collect(),
        all_artist_ids: artist_ids.iter().map(|id| id.to_string()).collect(),
        release_date: "2024-01-01".to_string(),
        duration_ms: 123456,
        popularity: 88,
        playlist_id: "pl1".to_string(),
    }
}

fn run_datasets() -> Vec<Dataset> {
    vec![
        Dataset::from_tracks("global", &[track(1, "Song (feat. B)", &["A1", "B2"]), track(2, "Other", &["A1"])]),
        Dataset::from_playlists(&[TrackedPlaylist {
            name: "global".to_string(),
            playlist_id: "pl1".to_string(),
            track_count: 2,
        }]),
        Dataset::from_artists(&[Artist {
            artist_id: "B2".to_string(),
            name: "Bee".to_string(),
            genres: ["house".to_string(), String::new(), String::new()],
        }]),
    ]
}

#[tokio::test]
async fn test_run_scope_loads_only_that_run() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let writer = StagingWriter::new(tmp.path());
    let store = memory_store().await;

    for second in [1, 2] {
        let ctx = ctx(second);
        let cleaned = clean_datasets(run_datasets(), &ctx);
        writer.stage_all(&cleaned, &ctx).unwrap();
    }

    let loader = Loader::new(&store, writer.clone());
    let outcome = loader
        .load_family(Family::Spotify, &LoadScope::Run(ctx(2).compact()))
        .await;

    assert_eq!(outcome.status, LoadStatus::Loaded { files: 1, rows: 2 });
    assert_eq!(store.count_rows("spotify_data_table").await.unwrap(), 2);

    let outcome = loader.load_family(Family::Spotify, &LoadScope::All).await;
    assert_eq!(outcome.status, LoadStatus::Loaded { files: 2, rows: 4 });
    assert_eq!(store.count_rows("spotify_data_table").await.unwrap(), 6);
}

#[tokio::test]
async fn test_typed_values_round_trip_through_store() {
    let tmp = TempDir::new().unwrap();
    let writer = StagingWriter::new(tmp.path());
    let store = memory_store().await;

    let ctx = ctx(3);
    writer.stage_all(&clean_datasets(run_datasets(), &ctx), &ctx).unwrap();

    let loader = Loader::new(&store, writer);
    let outcomes = loader.load_all(&LoadScope::Run(ctx.compact())).await;
    assert!(outcomes.iter().all(|o| !o.is_failed()), "{:?}", outcomes);

    let (song, duration, source_date): (String, i64, String) = sqlx::query_as(
        "SELECT song_name, duration_ms, source_date FROM spotify_data_table WHERE position = $1",
    )
    .bind(1i64)
    .fetch_one(store.pool())
    .await
    .unwrap();

    assert_eq!(song, "song");
    assert_eq!(duration, 123456);
    assert_eq!(source_date, "2024-06-01 12:00:03");

    let (name, genre_1): (String, String) =
        sqlx::query_as("SELECT name, genre_1 FROM artists_table WHERE artist_id = $1")
            .bind("B2")
            .fetch_one(store.pool())
            .await
            .unwrap();
    assert_eq!(name, "bee");
    assert_eq!(genre_1, "house");
}

#[tokio::test]
async fn test_families_without_destination_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let writer = StagingWriter::new(tmp.path());
    let store = memory_store().await;

    let ctx = ctx(4);
    let chart = Dataset::from_chart(
        Family::Billboard,
        "hot_100",
        &[trends_ingest::models::ChartEntry {
            position: 1,
            title: Some("Flowers".to_string()),
            artist_name: "Miley Cyrus".to_string(),
        }],
    );
    writer.stage_all(&clean_datasets(vec![chart], &ctx), &ctx).unwrap();

    let outcome = Loader::new(&store, writer)
        .load_family(Family::Billboard, &LoadScope::All)
        .await;
    assert_eq!(outcome.status, LoadStatus::Skipped);
}

#[tokio::test]
async fn test_bad_file_fails_only_its_family() {
    let tmp = TempDir::new().unwrap();
    let writer = StagingWriter::new(tmp.path());
    let store = memory_store().await;

    let ctx = ctx(5);
    writer.stage_all(&clean_datasets(run_datasets(), &ctx), &ctx).unwrap();

    // a hand-edited file with a column the artists table does not have
    std::fs::write(
        tmp.path().join(format!("artists_manual_{}.csv", ctx.compact())),
        "artist_id,followers\nZ9,100\n",
    )
    .unwrap();

    let outcomes = Loader::new(&store, writer)
        .load_all(&LoadScope::Run(ctx.compact()))
        .await;

    let artists = outcomes.iter().find(|o| o.family == Family::Artists).unwrap();
    assert!(artists.is_failed());
    assert_eq!(store.count_rows("artists_table").await.unwrap(), 0);

    let spotify = outcomes.iter().find(|o| o.family == Family::Spotify).unwrap();
    assert_eq!(spotify.status, LoadStatus::Loaded { files: 1, rows: 2 });

    let playlists = outcomes.iter().find(|o| o.family == Family::Playlists).unwrap();
    assert_eq!(playlists.status, LoadStatus::Loaded { files: 1, rows: 1 });
}

#[tokio::test]
async fn test_failed_file_rolls_back_whole_family() {
    let tmp = TempDir::new().unwrap();
    let writer = StagingWriter::new(tmp.path());

    let store = Store::connect(&memory_store_config()).await.unwrap();
    sqlx::query(
        "CREATE TABLE artists_table \
         (artist_id TEXT PRIMARY KEY, name TEXT, genre_1 TEXT, genre_2 TEXT, genre_3 TEXT)",
    )
    .execute(store.pool())
    .await
    .unwrap();
    store.ensure_schema().await.unwrap();

    let ctx = ctx(6);
    let staged = writer.stage_all(&clean_datasets(run_datasets(), &ctx), &ctx).unwrap();
    let artists_file = staged
        .iter()
        .find(|f| f.family == Family::Artists)
        .map(|f| f.path.clone())
        .unwrap();

    // sorts after the catalogue file and repeats its primary key
    std::fs::copy(
        &artists_file,
        tmp.path().join(format!("artists_manual_{}.csv", ctx.compact())),
    )
    .unwrap();

    let outcome = Loader::new(&store, writer)
        .load_family(Family::Artists, &LoadScope::Run(ctx.compact()))
        .await;

    assert!(outcome.is_failed(), "{}", outcome);
    assert_eq!(store.count_rows("artists_table").await.unwrap(), 0);
}
