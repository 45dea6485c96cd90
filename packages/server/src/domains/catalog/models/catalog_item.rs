use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::CatalogItemId;

/// A track in the catalog. Queue entries reference these by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CatalogItem {
    pub id: CatalogItemId,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_seconds: i32,
    pub genre: String, // 'rock', 'pop', 'jazz', 'hip-hop', etc.
    pub cover_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CatalogItem {
    /// `m:ss` display form of the duration.
    pub fn duration_formatted(&self) -> String {
        format!("{}:{:02}", self.duration_seconds / 60, self.duration_seconds % 60)
    }
}

impl std::fmt::Display for CatalogItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.title, self.artist)
    }
}

// =============================================================================
// Catalog Queries
// =============================================================================

impl CatalogItem {
    pub async fn find_by_id(id: CatalogItemId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM catalog_items WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Catalog listing, optionally filtered by genre.
    pub async fn find_all(genre: Option<&str>, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM catalog_items
            WHERE ($1::text IS NULL OR genre = $1)
            ORDER BY artist, title
            "#,
        )
        .bind(genre)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn count(pool: &PgPool) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM catalog_items")
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }
}

// =============================================================================
// Sample data
// =============================================================================

/// Stable ids for the sample tracks; the seed migration uses the same values.
pub const fn sample_item_id(n: u128) -> Uuid {
    Uuid::from_u128(0x0190_0000_0000_7000_8000_0000_0000_0000 | n)
}

/// The tracks seeded into a fresh catalog.
pub fn sample_items() -> Vec<CatalogItem> {
    const TRACKS: &[(&str, &str, &str, i32, &str)] = &[
        ("Bohemian Rhapsody", "Queen", "A Night at the Opera", 355, "rock"),
        ("Hotel California", "Eagles", "Hotel California", 391, "rock"),
        ("Billie Jean", "Michael Jackson", "Thriller", 294, "pop"),
        ("Blinding Lights", "The Weeknd", "After Hours", 200, "pop"),
        ("One More Time", "Daft Punk", "Discovery", 320, "electronic"),
        ("Midnight City", "M83", "Hurry Up, We're Dreaming", 244, "electronic"),
        ("Take Five", "Dave Brubeck", "Time Out", 324, "jazz"),
        ("So What", "Miles Davis", "Kind of Blue", 562, "jazz"),
        ("Clair de Lune", "Claude Debussy", "Suite bergamasque", 300, "classical"),
        ("Lose Yourself", "Eminem", "8 Mile Soundtrack", 326, "hip-hop"),
        ("Mr. Brightside", "The Killers", "Hot Fuss", 222, "alternative"),
        ("Do I Wanna Know?", "Arctic Monkeys", "AM", 272, "indie"),
    ];

    let created_at = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default();

    TRACKS
        .iter()
        .enumerate()
        .map(|(i, (title, artist, album, duration_seconds, genre))| CatalogItem {
            id: CatalogItemId::from_uuid(sample_item_id(i as u128 + 1)),
            title: (*title).to_string(),
            artist: (*artist).to_string(),
            album: (*album).to_string(),
            duration_seconds: *duration_seconds,
            genre: (*genre).to_string(),
            cover_url: None,
            created_at,
        })
        .collect()
}
