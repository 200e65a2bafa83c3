use tracing::{debug, info, warn};

use crate::{
    models::{CatalogItem, CatalogPage},
    services::CatalogService,
    Error, Result,
};

/// Title dropped from every catalog page before it reaches the list
pub const EXCLUDED_TITLE: &str = "Le Clitoris";

/// Accumulated browse list for one screen.
///
/// Owned by whoever shows the list and handed to the pager for each fetch,
/// so two screens never share pagination state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    current_page: u32,
    total_pages: u32,
    items: Vec<CatalogItem>,
    generation: u64,
    in_flight: Option<u32>,
}

/// What the list is waiting on, for spinners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    LoadingFirst,
    LoadingMore,
}

impl PaginationState {
    pub fn new() -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            items: Vec::new(),
            generation: 0,
            in_flight: None,
        }
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn in_flight(&self) -> Option<u32> {
        self.in_flight
    }

    /// Whether a "see more" makes sense
    pub fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn phase(&self) -> LoadPhase {
        match self.in_flight {
            None => LoadPhase::Idle,
            Some(1) => LoadPhase::LoadingFirst,
            Some(_) => LoadPhase::LoadingMore,
        }
    }

    /// The screen's context changed. Any response still on its way will be
    /// discarded when it arrives.
    pub fn invalidate(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.in_flight = None;
    }
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Ticket for one outstanding page fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Asked for a page past the last one the feed reported
    PastLastPage,
    /// That page is already being fetched
    AlreadyInFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Page applied; `added` items made it through the title filter
    Loaded { page: u32, added: usize },
    /// Nothing requested, state untouched
    Skipped(SkipReason),
    /// Response arrived after the state was invalidated and was dropped
    Stale,
}

/// Incremental pagination over the catalog feed
pub struct CatalogPager<C> {
    catalog: C,
    excluded_titles: Vec<String>,
}

impl<C: CatalogService> CatalogPager<C> {
    pub fn new(catalog: C) -> Self {
        Self::with_excluded_titles(catalog, vec![EXCLUDED_TITLE.to_string()])
    }

    pub fn with_excluded_titles(catalog: C, excluded_titles: Vec<String>) -> Self {
        Self {
            catalog,
            excluded_titles,
        }
    }

    /// Fetch a page and fold it into `state`.
    ///
    /// Page 1 replaces the list, later pages append. On failure the list and
    /// page counters are left exactly as they were.
    pub async fn fetch_page(&self, state: &mut PaginationState, page: u32) -> Result<FetchOutcome> {
        let Some(request) = self.begin(state, page)? else {
            let reason = skip_reason(state, page).unwrap_or(SkipReason::AlreadyInFlight);
            return Ok(FetchOutcome::Skipped(reason));
        };

        let result = self.execute(&request).await;
        self.apply(state, request, result)
    }

    /// Pull-to-refresh
    pub async fn refresh(&self, state: &mut PaginationState) -> Result<FetchOutcome> {
        self.fetch_page(state, 1).await
    }

    /// Fetch the page after the current one, if there is one
    pub async fn load_more(&self, state: &mut PaginationState) -> Result<FetchOutcome> {
        if !state.has_more() {
            return Ok(FetchOutcome::Skipped(SkipReason::PastLastPage));
        }
        let next = state.current_page + 1;
        self.fetch_page(state, next).await
    }

    /// Mark `page` as in flight and hand back a ticket, or `None` when the
    /// request should not be made at all.
    ///
    /// Together with `execute` and `apply` this lets a caller release its
    /// borrow of the state while the network call is outstanding.
    pub fn begin(&self, state: &mut PaginationState, page: u32) -> Result<Option<PageRequest>> {
        if page == 0 {
            return Err(Error::Validation("page numbers start at 1".into()));
        }

        if let Some(reason) = skip_reason(state, page) {
            debug!("Not fetching page {}: {:?}", page, reason);
            return Ok(None);
        }

        if let Some(pending) = state.in_flight {
            // A refresh supersedes whatever was still loading
            debug!("Refresh supersedes in-flight page {}", pending);
            state.generation = state.generation.wrapping_add(1);
        }

        state.in_flight = Some(page);
        Ok(Some(PageRequest {
            page,
            generation: state.generation,
        }))
    }

    /// Run the network call for a ticket. Touches no state.
    pub async fn execute(&self, request: &PageRequest) -> Result<CatalogPage> {
        let mut page = self.catalog.discover(request.page).await?;
        page.items.retain(|item| !self.is_excluded(&item.title));
        Ok(page)
    }

    /// Fold a finished fetch into the state it was started from
    pub fn apply(
        &self,
        state: &mut PaginationState,
        request: PageRequest,
        result: Result<CatalogPage>,
    ) -> Result<FetchOutcome> {
        if request.generation != state.generation {
            warn!(
                "Discarding stale response for page {} (generation {} != {})",
                request.page, request.generation, state.generation
            );
            return Ok(FetchOutcome::Stale);
        }

        if state.in_flight == Some(request.page) {
            state.in_flight = None;
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to fetch page {}: {}", request.page, e);
                return Err(e);
            }
        };

        let added = page.items.len();
        if request.page == 1 {
            state.items = page.items;
        } else {
            state.items.extend(page.items);
        }
        state.total_pages = page.total_pages.max(1);
        state.current_page = request.page.min(state.total_pages);

        info!(
            "Loaded page {}/{} ({} items, {} total)",
            state.current_page,
            state.total_pages,
            added,
            state.items.len()
        );

        Ok(FetchOutcome::Loaded {
            page: request.page,
            added,
        })
    }

    fn is_excluded(&self, title: &str) -> bool {
        self.excluded_titles.iter().any(|excluded| excluded == title)
    }
}

/// Why `page` must not be requested right now, if it must not.
///
/// Only one page is fetched at a time. The exception is page 1, which may
/// always restart the list unless page 1 itself is already loading.
fn skip_reason(state: &PaginationState, page: u32) -> Option<SkipReason> {
    if page > state.total_pages {
        return Some(SkipReason::PastLastPage);
    }
    match state.in_flight {
        Some(pending) if pending == page || page != 1 => Some(SkipReason::AlreadyInFlight),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockCatalogService;

    fn item(id: u64, title: &str) -> CatalogItem {
        CatalogItem {
            id,
            title: title.to_string(),
            poster_path: None,
            overview: None,
        }
    }

    fn page_of(items: Vec<CatalogItem>, total_pages: u32) -> CatalogPage {
        CatalogPage { items, total_pages }
    }

    fn ids(state: &PaginationState) -> Vec<u64> {
        state.items().iter().map(|i| i.id).collect()
    }

    #[tokio::test]
    async fn test_first_page_drops_excluded_title() {
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_discover()
            .withf(|page| *page == 1)
            .times(1)
            .returning(|_| Ok(page_of(vec![item(1, "Le Clitoris"), item(2, "A")], 3)));

        let pager = CatalogPager::new(catalog);
        let mut state = PaginationState::new();

        let outcome = pager.fetch_page(&mut state, 1).await.unwrap();

        assert_eq!(outcome, FetchOutcome::Loaded { page: 1, added: 1 });
        assert_eq!(state.items(), &[item(2, "A")]);
        assert_eq!(state.total_pages(), 3);
        assert!(state.has_more());
    }

    #[tokio::test]
    async fn test_later_pages_append_and_page_one_replaces() {
        let mut catalog = MockCatalogService::new();
        catalog.expect_discover().returning(|page| {
            let base = page as u64 * 10;
            Ok(page_of(vec![item(base + 1, "x"), item(base + 2, "y")], 3))
        });

        let pager = CatalogPager::new(catalog);
        let mut state = PaginationState::new();

        pager.fetch_page(&mut state, 1).await.unwrap();
        pager.fetch_page(&mut state, 2).await.unwrap();
        assert_eq!(ids(&state), vec![11, 12, 21, 22]);
        assert_eq!(state.current_page(), 2);

        pager.load_more(&mut state).await.unwrap();
        assert_eq!(ids(&state), vec![11, 12, 21, 22, 31, 32]);
        assert!(!state.has_more());

        pager.refresh(&mut state).await.unwrap();
        assert_eq!(ids(&state), vec![11, 12]);
        assert_eq!(state.current_page(), 1);
    }

    #[tokio::test]
    async fn test_page_past_the_end_never_hits_network() {
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_discover()
            .times(1)
            .returning(|_| Ok(page_of(vec![item(1, "A")], 2)));

        let pager = CatalogPager::new(catalog);
        let mut state = PaginationState::new();
        pager.fetch_page(&mut state, 1).await.unwrap();
        let before = state.clone();

        let outcome = pager.fetch_page(&mut state, 3).await.unwrap();

        assert_eq!(outcome, FetchOutcome::Skipped(SkipReason::PastLastPage));
        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn test_load_more_on_last_page_is_noop() {
        let mut catalog = MockCatalogService::new();
        catalog.expect_discover().never();

        let pager = CatalogPager::new(catalog);
        let mut state = PaginationState::new();

        let outcome = pager.load_more(&mut state).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Skipped(SkipReason::PastLastPage));
    }

    #[tokio::test]
    async fn test_page_zero_is_rejected() {
        let mut catalog = MockCatalogService::new();
        catalog.expect_discover().never();

        let pager = CatalogPager::new(catalog);
        let mut state = PaginationState::new();

        let err = pager.fetch_page(&mut state, 0).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_failure_leaves_state_intact() {
        let mut catalog = MockCatalogService::new();
        let mut seq = mockall::Sequence::new();
        catalog
            .expect_discover()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page_of(vec![item(1, "A"), item(2, "B")], 4)));
        catalog
            .expect_discover()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(Error::NetworkFailure("connection reset".into())));

        let pager = CatalogPager::new(catalog);
        let mut state = PaginationState::new();
        pager.fetch_page(&mut state, 1).await.unwrap();
        let before = state.clone();

        let err = pager.fetch_page(&mut state, 2).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(state, before);
        assert_eq!(state.phase(), LoadPhase::Idle);
    }

    #[tokio::test]
    async fn test_same_page_cannot_be_requested_twice() {
        let catalog = MockCatalogService::new();
        let pager = CatalogPager::new(catalog);
        let mut state = PaginationState::new();

        let first = pager.begin(&mut state, 1).unwrap();
        assert!(first.is_some());
        assert_eq!(state.phase(), LoadPhase::LoadingFirst);

        let second = pager.begin(&mut state, 1).unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_in_flight_duplicate_reports_skip() {
        let catalog = MockCatalogService::new();
        let pager = CatalogPager::new(catalog);
        let mut state = PaginationState::new();

        pager.begin(&mut state, 1).unwrap();
        let outcome = pager.fetch_page(&mut state, 1).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Skipped(SkipReason::AlreadyInFlight));
    }

    #[tokio::test]
    async fn test_refresh_supersedes_outstanding_page() {
        let mut catalog = MockCatalogService::new();
        catalog.expect_discover().returning(|page| {
            let base = page as u64 * 10;
            Ok(page_of(vec![item(base + 1, "x")], 3))
        });

        let pager = CatalogPager::new(catalog);
        let mut state = PaginationState::new();
        pager.fetch_page(&mut state, 1).await.unwrap();

        let more = pager.begin(&mut state, 2).unwrap().unwrap();
        assert_eq!(state.phase(), LoadPhase::LoadingMore);

        // Another page has to wait, a refresh does not
        assert!(pager.begin(&mut state, 3).unwrap().is_none());
        let refresh = pager.begin(&mut state, 1).unwrap().unwrap();

        let late = pager.execute(&more).await;
        assert_eq!(pager.apply(&mut state, more, late).unwrap(), FetchOutcome::Stale);

        let fresh = pager.execute(&refresh).await;
        pager.apply(&mut state, refresh, fresh).unwrap();
        assert_eq!(ids(&state), vec![11]);
        assert_eq!(state.phase(), LoadPhase::Idle);
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_discover()
            .returning(|_| Ok(page_of(vec![item(7, "Late")], 5)));

        let pager = CatalogPager::new(catalog);
        let mut state = PaginationState::new();

        let request = pager.begin(&mut state, 1).unwrap().unwrap();
        let result = pager.execute(&request).await;

        // User navigated elsewhere before the response landed
        state.invalidate();
        let before = state.clone();

        let outcome = pager.apply(&mut state, request, result).unwrap();
        assert_eq!(outcome, FetchOutcome::Stale);
        assert_eq!(state, before);
        assert!(state.items().is_empty());
    }

    #[tokio::test]
    async fn test_custom_excluded_titles() {
        let mut catalog = MockCatalogService::new();
        catalog.expect_discover().returning(|_| {
            Ok(page_of(
                vec![item(1, "Le Clitoris"), item(2, "Skip me"), item(3, "Keep")],
                1,
            ))
        });

        let pager = CatalogPager::with_excluded_titles(catalog, vec!["Skip me".into()]);
        let mut state = PaginationState::new();
        pager.fetch_page(&mut state, 1).await.unwrap();

        assert_eq!(ids(&state), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_no_page_ever_contains_excluded_title() {
        let mut catalog = MockCatalogService::new();
        catalog.expect_discover().returning(|page| {
            let base = page as u64 * 100;
            Ok(page_of(
                vec![
                    item(base, EXCLUDED_TITLE),
                    item(base + 1, "ok"),
                    item(base + 2, EXCLUDED_TITLE),
                ],
                4,
            ))
        });

        let pager = CatalogPager::new(catalog);
        let mut state = PaginationState::new();
        for page in 1..=4 {
            pager.fetch_page(&mut state, page).await.unwrap();
        }

        assert_eq!(state.items().len(), 4);
        assert!(state.items().iter().all(|i| i.title != EXCLUDED_TITLE));
    }
}
