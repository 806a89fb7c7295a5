//! Shared helpers for trends-ingest integration tests
//!
//! - in-memory SQLite stores
//! - wiremock responders for chart pages and the catalogue API
//! - fixed run contexts so staged file names never collide

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::path::Path;
use trends_ingest::config::{CatalogueConfig, ChartConfig, IngestConfig, StagingConfig, StoreConfig};
use trends_ingest::store::SqlValue;
use trends_ingest::{RunContext, Store};
use wiremock::matchers::{body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_TOKEN: &str = "test-access-token";

/// Route test logs through the libtest capture
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("trends_ingest=debug")
        .try_init();
}

/// Run context at 2024-06-01 12:00:`second`
pub fn ctx(second: u32) -> RunContext {
    RunContext::at(
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, second)
            .single()
            .expect("valid timestamp"),
    )
}

pub fn memory_store_config() -> StoreConfig {
    StoreConfig::default()
        .with_database_url("sqlite::memory:")
        .with_max_connections(1)
}

pub async fn memory_store() -> Store {
    let store = Store::connect(&memory_store_config())
        .await
        .expect("Failed to open in-memory store");
    store.ensure_schema().await.expect("Failed to create schema");
    store
}

/// Insert bare artist rows so they count as already known
pub async fn seed_artists(store: &Store, ids: &[&str]) {
    let columns: Vec<String> = ["artist_id", "name", "genre_1", "genre_2", "genre_3"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    let rows: Vec<Vec<SqlValue>> = ids
        .iter()
        .map(|id| {
            vec![
                SqlValue::Text(id.to_string()),
                SqlValue::Text(format!("seeded {}", id)),
                SqlValue::Text(String::new()),
                SqlValue::Text(String::new()),
                SqlValue::Text(String::new()),
            ]
        })
        .collect();

    store
        .append_rows("artists_table", &columns, &rows)
        .await
        .expect("Failed to seed artists");
}

/// Configuration pointing every adapter at `server`
pub fn mock_config(server: &MockServer, staging_dir: &Path) -> IngestConfig {
    IngestConfig {
        charts: ChartConfig::default()
            .with_billboard_url(server.uri())
            .with_djmag_url(server.uri())
            .with_timeout(5),
        catalogue: CatalogueConfig::default()
            .with_credentials("client-id", "client-secret")
            .with_accounts_url(server.uri())
            .with_api_url(format!("{}/v1", server.uri()))
            .with_playlists(Vec::new())
            .with_timeout(5),
        staging: StagingConfig {
            dir: staging_dir.to_path_buf(),
        },
        store: memory_store_config(),
    }
}

pub fn billboard_html(entries: &[(&str, &str)]) -> String {
    let items: String = entries
        .iter()
        .map(|(title, artist)| {
            format!(
                r#"<li><span class="chart-element__information">
                    <span class="chart-element__information__song">{}</span>
                    <span class="chart-element__information__artist">{}</span>
                </span></li>"#,
                title, artist
            )
        })
        .collect();
    format!("<html><body><ol>{}</ol></body></html>", items)
}

pub fn djmag_html(names: &[&str]) -> String {
    let blocks: String = names
        .iter()
        .map(|name| format!(r#"<div class="top100dj-name"><a href="/dj">{}</a></div>"#, name))
        .collect();
    format!("<html><body>{}</body></html>", blocks)
}

/// Chart pages for both ranking providers
pub async fn mount_chart_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/charts/hot-100"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(billboard_html(&[("Flowers", "Miley Cyrus"), ("Kill Bill", "SZA")])),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/top100djs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(djmag_html(&["Martin Garrix", "David Guetta"])))
        .mount(server)
        .await;
}

/// Token endpoint granting `TEST_TOKEN`
pub async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(header_exists("authorization"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": TEST_TOKEN,
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

/// Playlist track object crediting `artists` as `(id, name)`
pub fn track_json(name: &str, artists: &[(&str, &str)]) -> Value {
    json!({
        "track": {
            "name": name,
            "artists": artists
                .iter()
                .map(|(id, name)| json!({"id": id, "name": name}))
                .collect::<Vec<_>>(),
            "album": {"release_date": "2024-01-01"},
            "duration_ms": 200000,
            "popularity": 75
        }
    })
}

pub fn playlist_json(name: &str, items: Vec<Value>) -> Value {
    json!({
        "name": name,
        "tracks": {"items": items, "next": null}
    })
}

pub fn artists_json(ids: &[&str]) -> Value {
    json!({
        "artists": ids
            .iter()
            .map(|id| json!({"id": id, "name": format!("Artist {}", id), "genres": ["Dance Pop"]}))
            .collect::<Vec<_>>()
    })
}

/// Requests the server received for `request_path`
pub async fn hits(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}
