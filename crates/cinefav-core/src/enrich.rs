use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::{
    models::{EnrichedFavorite, FavoriteRecord},
    services::CatalogService,
    Result,
};

/// Joins bare favorite records with catalog metadata
pub struct DetailEnricher<C> {
    catalog: C,
}

impl<C: CatalogService> DetailEnricher<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// Look the record up, failing if the catalog does
    pub async fn try_enrich(&self, record: &FavoriteRecord) -> Result<EnrichedFavorite> {
        let details = self.catalog.get_by_id(record.id).await?;
        Ok(EnrichedFavorite::joined(record, details))
    }

    /// Look the record up; on failure keep id and title and leave the rest out
    pub async fn enrich(&self, record: &FavoriteRecord) -> EnrichedFavorite {
        match self.try_enrich(record).await {
            Ok(enriched) => enriched,
            Err(e) => {
                warn!("Could not enrich favorite {} ({}): {}", record.id, record.title, e);
                EnrichedFavorite::partial(record)
            }
        }
    }

    /// Enrich a whole batch, at most `concurrency` lookups at a time.
    ///
    /// Output order matches input order no matter which lookups finish
    /// first, and there is exactly one output per input.
    pub async fn enrich_all(
        &self,
        records: &[FavoriteRecord],
        concurrency: usize,
    ) -> Vec<EnrichedFavorite> {
        debug!("Enriching {} favorites", records.len());

        stream::iter(records)
            .map(|record| self.enrich(record))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogDetails, CatalogPage, Enrichment};
    use crate::services::MockCatalogService;
    use crate::Error;
    use std::sync::Mutex;
    use std::time::Duration;

    fn record(id: u64, title: &str) -> FavoriteRecord {
        FavoriteRecord {
            id,
            title: title.to_string(),
        }
    }

    fn details(id: u64) -> CatalogDetails {
        CatalogDetails {
            id,
            poster_path: Some(format!("/{}.jpg", id)),
            overview: Some(format!("about {}", id)),
        }
    }

    #[tokio::test]
    async fn test_enrich_joins_metadata() {
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_get_by_id()
            .withf(|id| *id == 5)
            .times(1)
            .returning(|id| Ok(details(id)));

        let enricher = DetailEnricher::new(catalog);
        let enriched = enricher.enrich(&record(5, "Coco")).await;

        assert_eq!(enriched.title, "Coco");
        assert_eq!(enriched.poster_path.as_deref(), Some("/5.jpg"));
        assert_eq!(enriched.enrichment, Enrichment::Complete);
    }

    #[tokio::test]
    async fn test_failed_lookup_degrades_instead_of_failing() {
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_get_by_id()
            .returning(|_| Err(Error::NetworkFailure("timeout".into())));

        let enricher = DetailEnricher::new(catalog);

        assert!(enricher.try_enrich(&record(5, "Coco")).await.is_err());

        let enriched = enricher.enrich(&record(5, "Coco")).await;
        assert_eq!(enriched.id, 5);
        assert_eq!(enriched.title, "Coco");
        assert!(enriched.poster_path.is_none());
        assert!(enriched.overview.is_none());
        assert_eq!(enriched.enrichment, Enrichment::Partial);
    }

    #[tokio::test]
    async fn test_batch_keeps_order_and_length_with_failures() {
        let mut catalog = MockCatalogService::new();
        catalog.expect_get_by_id().returning(|id| {
            if id % 2 == 0 {
                Err(Error::NotFound(format!("movie {}", id)))
            } else {
                Ok(details(id))
            }
        });

        let enricher = DetailEnricher::new(catalog);
        let records: Vec<_> = [9, 2, 7, 4, 1].iter().map(|&id| record(id, "t")).collect();

        let enriched = enricher.enrich_all(&records, 3).await;

        let ids: Vec<u64> = enriched.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![9, 2, 7, 4, 1]);

        let partial: Vec<u64> = enriched
            .iter()
            .filter(|e| e.enrichment == Enrichment::Partial)
            .map(|e| e.id)
            .collect();
        assert_eq!(partial, vec![2, 4]);
    }

    /// Catalog whose lookups take longer the larger the id, recording the
    /// order they finish in
    struct SlowCatalog {
        finished: Mutex<Vec<u64>>,
    }

    #[async_trait::async_trait]
    impl CatalogService for SlowCatalog {
        async fn discover(&self, _page: u32) -> Result<CatalogPage> {
            Ok(CatalogPage {
                items: vec![],
                total_pages: 1,
            })
        }

        async fn get_by_id(&self, id: u64) -> Result<CatalogDetails> {
            tokio::time::sleep(Duration::from_millis(id * 20)).await;
            self.finished.lock().unwrap().push(id);
            if id == 3 {
                return Err(Error::NetworkFailure("timeout".into()));
            }
            Ok(details(id))
        }
    }

    #[tokio::test]
    async fn test_slow_early_lookups_do_not_reorder_results() {
        let catalog = SlowCatalog {
            finished: Mutex::new(Vec::new()),
        };
        let enricher = DetailEnricher::new(catalog);
        let records: Vec<_> = [5, 4, 3, 2, 1].iter().map(|&id| record(id, "t")).collect();

        let enriched = enricher.enrich_all(&records, 5).await;

        let finished = enricher.catalog.finished.lock().unwrap().clone();
        assert_eq!(finished, vec![1, 2, 3, 4, 5]);

        let ids: Vec<u64> = enriched.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![5, 4, 3, 2, 1]);
        assert_eq!(enriched[2].enrichment, Enrichment::Partial);
        assert_eq!(enriched[0].poster_path.as_deref(), Some("/5.jpg"));
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_makes_progress() {
        let mut catalog = MockCatalogService::new();
        catalog.expect_get_by_id().returning(|id| Ok(details(id)));

        let enricher = DetailEnricher::new(catalog);
        let enriched = enricher.enrich_all(&[record(1, "a")], 0).await;
        assert_eq!(enriched.len(), 1);
    }
}
