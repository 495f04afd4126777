//! Caching decorators for the directory and review sources
//!
//! A hit short-circuits the inner fetch. Only successful results are
//! stored; errors always pass through uncached.

use super::{GameDirectory, ReviewSource};
use crate::cache::{games_page_key, get_typed, review_key, review_list_key, set_typed, SessionCache};
use crate::error::Result;
use crate::types::{GameId, GameRecord, GamesPage, PageQuery, PlayerId, ReviewMetadata, ReviewSummary};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct CachedDirectory<D> {
    inner: D,
    cache: Arc<dyn SessionCache>,
}

impl<D: GameDirectory> CachedDirectory<D> {
    pub fn new(inner: D, cache: Arc<dyn SessionCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<D: GameDirectory> GameDirectory for CachedDirectory<D> {
    async fn fetch_games_page(
        &self,
        player: PlayerId,
        page: u32,
        query: &PageQuery,
    ) -> Result<GamesPage> {
        let key = games_page_key(player, page, query);
        if let Some(hit) = get_typed::<GamesPage>(self.cache.as_ref(), &key) {
            debug!("Cache hit: {}", key);
            return Ok(hit);
        }
        let fetched = self.inner.fetch_games_page(player, page, query).await?;
        set_typed(self.cache.as_ref(), &key, &fetched);
        Ok(fetched)
    }

    async fn fetch_review_list(&self, game: GameId) -> Result<Vec<ReviewSummary>> {
        let key = review_list_key(game);
        if let Some(hit) = get_typed::<Vec<ReviewSummary>>(self.cache.as_ref(), &key) {
            debug!("Cache hit: {}", key);
            return Ok(hit);
        }
        let fetched = self.inner.fetch_review_list(game).await?;
        set_typed(self.cache.as_ref(), &key, &fetched);
        Ok(fetched)
    }

    async fn fetch_game(&self, game: GameId) -> Result<GameRecord> {
        self.inner.fetch_game(game).await
    }
}

pub struct CachedReviewSource<R> {
    inner: R,
    cache: Arc<dyn SessionCache>,
}

impl<R: ReviewSource> CachedReviewSource<R> {
    pub fn new(inner: R, cache: Arc<dyn SessionCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<R: ReviewSource> ReviewSource for CachedReviewSource<R> {
    async fn fetch_review(&self, game: GameId, review: &ReviewSummary) -> Result<ReviewMetadata> {
        let key = review_key(game);
        if let Some(hit) = get_typed::<ReviewMetadata>(self.cache.as_ref(), &key) {
            debug!("Cache hit: {}", key);
            return Ok(hit);
        }
        let fetched = self.inner.fetch_review(game, review).await?;
        set_typed(self.cache.as_ref(), &key, &fetched);
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, NoopCache};
    use crate::error::InsightError;
    use crate::types::{BoardMove, Side};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingReviews {
        calls: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl ReviewSource for CountingReviews {
        async fn fetch_review(&self, _game: GameId, _review: &ReviewSummary) -> Result<ReviewMetadata> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(InsightError::Timeout(std::time::Duration::from_secs(15)));
            }
            Ok(ReviewMetadata {
                moves: vec![BoardMove::Play { x: 0, y: 0 }],
                scores: vec![Some(0.0), Some(1.0)],
                win_rates: vec![Some(0.5), Some(0.4)],
                initial_player: Side::Black,
                width: 19,
                height: 19,
            })
        }
    }

    fn summary() -> ReviewSummary {
        ReviewSummary {
            id: 1,
            uuid: "u".to_string(),
        }
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let cache = Arc::new(MemoryCache::new(16));
        let source = CachedReviewSource::new(CountingReviews::default(), cache.clone());

        let first = source.fetch_review(GameId(3), &summary()).await.unwrap();
        let second = source.fetch_review(GameId(3), &summary()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 1);
        assert!(cache.get("ogs.ai.3").is_some());
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = Arc::new(MemoryCache::new(16));
        let source = CachedReviewSource::new(
            CountingReviews {
                fail: true,
                ..Default::default()
            },
            cache.clone(),
        );

        assert!(source.fetch_review(GameId(3), &summary()).await.is_err());
        assert!(source.fetch_review(GameId(3), &summary()).await.is_err());
        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_cache_always_fetches() {
        let source = CachedReviewSource::new(CountingReviews::default(), Arc::new(NoopCache));

        let first = source.fetch_review(GameId(3), &summary()).await.unwrap();
        let second = source.fetch_review(GameId(3), &summary()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 2);
    }
}
