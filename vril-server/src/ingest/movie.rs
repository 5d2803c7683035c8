//! Movie ingestion pipeline
//!
//! DEDUPE → FETCH_DETAILS → FETCH_CREDITS → RESOLVE_TAXONOMY →
//! FETCH_IMAGES → PERSIST. Details and the final persist are the primary
//! path; everything else degrades to warnings so one flaky upstream call
//! never loses a movie.

use super::{IngestError, IngestOutcome, IngestStage};
use crate::clients::TmdbClient;
use crate::db::{assets, movies, terms};
use crate::media::{image_file_name, MediaStore};
use sqlx::SqlitePool;
use vril_common::watermark;

/// Poster and backdrop download widths (CDN size buckets)
const POSTER_WIDTH: u32 = 780;
const BACKDROP_WIDTH: u32 = 1280;

/// What the image stage decided for one asset kind
enum ImagePlan {
    /// Existing asset has the same source path
    Keep,
    /// New bytes stored, prior file (if any) to unlink after persist
    Replace {
        kind: &'static str,
        source_path: String,
        file_path: String,
        old_file: Option<String>,
    },
}

/// Movie ingestion pipeline
pub struct MovieIngestor<'a> {
    pub db: &'a SqlitePool,
    pub tmdb: &'a TmdbClient,
    pub media: &'a MediaStore,
}

impl MovieIngestor<'_> {
    /// Run the full pipeline for one TMDb ID
    ///
    /// `to_watch`: `Some` overwrites the watch flag, `None` preserves the
    /// existing value (new movies default to not-listed).
    pub async fn ingest(
        &self,
        tmdb_id: i64,
        to_watch: Option<bool>,
    ) -> Result<IngestOutcome, IngestError> {
        let mut warnings = Vec::new();

        // DEDUPE: an existing movie makes this an update-in-place
        let existing = movies::find_by_tmdb_id(self.db, tmdb_id)
            .await
            .map_err(|e| IngestError::new(IngestStage::Dedupe, e.to_string()))?;

        let existing_assets = match &existing {
            Some(movie) => assets::find_for_movie(self.db, movie.id)
                .await
                .map_err(|e| IngestError::new(IngestStage::Dedupe, e.to_string()))?,
            None => Vec::new(),
        };

        if let Some(movie) = &existing {
            tracing::info!(tmdb_id, movie_id = movie.id, "Movie already tracked, updating in place");
        }

        // FETCH_DETAILS: primary path, aborts the pipeline
        let details = self
            .tmdb
            .fetch_details(tmdb_id)
            .await
            .map_err(|e| IngestError::new(IngestStage::FetchDetails, e.to_string()))?;

        // FETCH_CREDITS: secondary, a failure leaves credits empty
        let credits = match self.tmdb.fetch_credits(tmdb_id).await {
            Ok(credits) => credits,
            Err(e) => {
                tracing::warn!(tmdb_id, error = %e, "Credits fetch failed, continuing without");
                warnings.push(format!("Credits unavailable: {}", e));
                Default::default()
            }
        };

        // RESOLVE_TAXONOMY: best-effort per term
        let mut term_ids = Vec::new();
        let term_sources = details
            .genres
            .iter()
            .map(|g| (terms::TAX_GENRE, g))
            .chain(
                details
                    .production_companies
                    .iter()
                    .map(|c| (terms::TAX_COMPANY, c)),
            );

        for (taxonomy, term) in term_sources {
            match terms::resolve_or_create(self.db, taxonomy, Some(term.id), &term.name).await {
                Ok(id) => term_ids.push(id),
                Err(e) => {
                    tracing::warn!(taxonomy, name = %term.name, error = %e, "Term resolution failed");
                    warnings.push(format!("Could not resolve {} \"{}\"", taxonomy, term.name));
                }
            }
        }

        // FETCH_IMAGES: skip unchanged source paths, degrade on failure
        let mut image_plans = Vec::new();
        let image_sources = [
            (assets::KIND_POSTER, POSTER_WIDTH, details.poster_path.clone()),
            (assets::KIND_BACKDROP, BACKDROP_WIDTH, details.backdrop_path.clone()),
        ];

        for (kind, width, source_path) in image_sources {
            let Some(source_path) = source_path.filter(|p| !p.is_empty()) else {
                continue;
            };

            let current = existing_assets.iter().find(|a| a.kind == kind);
            if current.is_some_and(|a| a.source_path == source_path) {
                tracing::debug!(tmdb_id, kind, "Image source unchanged, keeping asset");
                image_plans.push(ImagePlan::Keep);
                continue;
            }

            match self.fetch_image(&details.title, tmdb_id, kind, width, &source_path).await {
                Ok(file_path) => image_plans.push(ImagePlan::Replace {
                    kind,
                    source_path,
                    file_path,
                    old_file: current.map(|a| a.file_path.clone()),
                }),
                Err(message) => {
                    tracing::warn!(tmdb_id, kind, error = %message, "Image fetch failed");
                    warnings.push(format!("Could not fetch {} image: {}", kind, message));
                }
            }
        }

        // PERSIST: write fields, terms, assets, then bump the watermark
        let fields = movies::MovieFields {
            tmdb_id,
            title: details.title.clone(),
            synopsis: details.overview.clone(),
            tagline: details.tagline.clone(),
            release_date: details.release_date.clone(),
            runtime_minutes: details.runtime,
            rating: details.certification().unwrap_or_default(),
            budget: details.budget,
            box_office: details.revenue,
            website: details.homepage.clone().unwrap_or_default(),
            director: credits.directors().join(", "),
            writer: credits.writers().join(", "),
            to_watch: to_watch
                .or_else(|| existing.as_ref().map(|m| m.to_watch))
                .unwrap_or(false),
        };

        let movie_id = movies::upsert_movie(self.db, &fields)
            .await
            .map_err(|e| IngestError::new(IngestStage::Persist, e.to_string()))?;

        movies::set_movie_terms(self.db, movie_id, &term_ids)
            .await
            .map_err(|e| IngestError::new(IngestStage::Persist, e.to_string()))?;

        for plan in image_plans {
            if let ImagePlan::Replace {
                kind,
                source_path,
                file_path,
                old_file,
            } = plan
            {
                assets::upsert_asset(self.db, movie_id, kind, &source_path, &file_path)
                    .await
                    .map_err(|e| IngestError::new(IngestStage::Persist, e.to_string()))?;

                if let Some(old_file) = old_file {
                    if old_file != file_path {
                        self.media.remove(&old_file);
                    }
                }
            }
        }

        watermark::bump(self.db)
            .await
            .map_err(|e| IngestError::new(IngestStage::Persist, e.to_string()))?;

        let created = existing.is_none();
        tracing::info!(
            tmdb_id,
            movie_id,
            created,
            warnings = warnings.len(),
            title = %fields.title,
            "Movie ingestion complete"
        );

        Ok(IngestOutcome {
            entity_id: movie_id,
            created,
            warnings,
        })
    }

    /// Download, optimize, and store one image; errors become strings for
    /// the warning list
    async fn fetch_image(
        &self,
        title: &str,
        tmdb_id: i64,
        kind: &str,
        width: u32,
        source_path: &str,
    ) -> Result<String, String> {
        let bytes = self
            .tmdb
            .download_image(width, source_path)
            .await
            .map_err(|e| e.to_string())?;

        let file_name = image_file_name(title, tmdb_id, kind, source_path);

        self.media
            .store_image(&file_name, bytes)
            .map_err(|e| e.to_string())
    }
}
