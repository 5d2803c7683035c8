//! Article ingestion pipeline
//!
//! DEDUPE → FETCH_META → RESOLVE_TAXONOMY → PERSIST. The metadata scrape
//! is best-effort: an unreachable page falls back to the URL itself as
//! the title, never to a failed ingestion.

use super::{IngestError, IngestOutcome, IngestStage};
use crate::clients::PageMetaClient;
use crate::db::{articles, terms};
use sqlx::SqlitePool;
use vril_common::watermark;

/// Article ingestion pipeline
pub struct ArticleIngestor<'a> {
    pub db: &'a SqlitePool,
    pub page_meta: &'a PageMetaClient,
}

impl ArticleIngestor<'_> {
    /// Run the pipeline for one article URL
    ///
    /// `tag_ids` must reference existing article-tag terms; unknown IDs
    /// are skipped with a warning rather than failing the save.
    pub async fn ingest(
        &self,
        url: &str,
        tag_ids: &[i64],
        read: bool,
        favorite: bool,
    ) -> Result<IngestOutcome, IngestError> {
        let mut warnings = Vec::new();
        let normalized = articles::normalize_url(url);

        // DEDUPE
        let existing = articles::find_by_url(self.db, &normalized)
            .await
            .map_err(|e| IngestError::new(IngestStage::Dedupe, e.to_string()))?;

        if let Some(article) = &existing {
            tracing::info!(url = %normalized, article_id = article.id, "Article already tracked, updating in place");
        }

        // FETCH_META: best-effort scrape with layered fallbacks
        let meta = self.page_meta.fetch_page_meta(&normalized).await;
        if meta.is_none() {
            warnings.push("Page metadata unavailable; using URL as title".to_string());
        }

        let title = meta
            .as_ref()
            .map(|m| m.title.clone())
            .or_else(|| existing.as_ref().map(|a| a.title.clone()))
            .unwrap_or_else(|| normalized.clone());

        let description = meta
            .as_ref()
            .map(|m| m.description.clone())
            .or_else(|| existing.as_ref().map(|a| a.description.clone()))
            .unwrap_or_default();

        // RESOLVE_TAXONOMY: keep only tag IDs that actually exist
        let mut term_ids = Vec::new();
        for &tag_id in tag_ids {
            match terms::exists(self.db, terms::TAX_ARTICLE_TAG, tag_id).await {
                Ok(true) => term_ids.push(tag_id),
                Ok(false) => {
                    warnings.push(format!("Unknown tag ID {} skipped", tag_id));
                }
                Err(e) => {
                    tracing::warn!(tag_id, error = %e, "Tag lookup failed");
                    warnings.push(format!("Could not resolve tag ID {}", tag_id));
                }
            }
        }

        // PERSIST
        let fields = articles::ArticleFields {
            url: normalized.clone(),
            title,
            description,
            read,
            favorite,
        };

        let article_id = articles::upsert_article(self.db, &fields)
            .await
            .map_err(|e| IngestError::new(IngestStage::Persist, e.to_string()))?;

        articles::set_article_terms(self.db, article_id, &term_ids)
            .await
            .map_err(|e| IngestError::new(IngestStage::Persist, e.to_string()))?;

        watermark::bump(self.db)
            .await
            .map_err(|e| IngestError::new(IngestStage::Persist, e.to_string()))?;

        let created = existing.is_none();
        tracing::info!(
            url = %normalized,
            article_id,
            created,
            warnings = warnings.len(),
            "Article ingestion complete"
        );

        Ok(IngestOutcome {
            entity_id: article_id,
            created,
            warnings,
        })
    }
}
