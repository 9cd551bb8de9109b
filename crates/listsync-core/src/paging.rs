use listsync_models::{Page, PageCursor};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(500);

/// How a paginated listing is walked.
///
/// Both policies fetch every page the remote reports; they differ in pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagePolicy {
    /// Keep going while the remote reports more pages than fetched so far,
    /// pausing between requests
    ExhaustiveWithBackoff { delay: Duration },
    /// Stop as soon as the page just fetched is the last one reported, or past it
    ExhaustiveUntilEqual,
}

impl PagePolicy {
    pub fn with_backoff(delay: Duration) -> Self {
        PagePolicy::ExhaustiveWithBackoff { delay }
    }

    fn has_more<T>(&self, cursor: PageCursor, page: &Page<T>) -> bool {
        match self {
            PagePolicy::ExhaustiveWithBackoff { .. } => page.total_pages > cursor.page,
            PagePolicy::ExhaustiveUntilEqual => cursor.page < page.total_pages,
        }
    }

    fn delay(&self) -> Option<Duration> {
        match self {
            PagePolicy::ExhaustiveWithBackoff { delay } if !delay.is_zero() => Some(*delay),
            _ => None,
        }
    }
}

impl Default for PagePolicy {
    fn default() -> Self {
        PagePolicy::with_backoff(DEFAULT_PAGE_DELAY)
    }
}

/// Walks a listing from page 1, handing each page's items to `on_page`.
///
/// Returns the number of pages fetched. The first failing page ends the walk
/// with its error. Dropping the returned future between pages stops the walk
/// without issuing further requests.
pub async fn walk_pages<T, E, F, Fut, C>(
    policy: PagePolicy,
    limit: Option<u32>,
    mut fetch: F,
    mut on_page: C,
) -> Result<u32, E>
where
    F: FnMut(PageCursor) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
    C: FnMut(Vec<T>),
{
    let mut cursor = PageCursor::first(limit);
    let mut fetched = 0;

    loop {
        let page = fetch(cursor).await?;
        fetched += 1;
        debug!(
            page = cursor.page,
            total_pages = page.total_pages,
            items = page.items.len(),
            "Fetched page"
        );

        let more = policy.has_more(cursor, &page);
        on_page(page.items);
        if !more {
            break;
        }

        if let Some(delay) = policy.delay() {
            tokio::time::sleep(delay).await;
        }
        cursor = cursor.next();
    }

    Ok(fetched)
}

/// Collects every item of a listing in page order. Nothing is returned unless
/// every page succeeded.
pub async fn fetch_all<T, E, F, Fut>(policy: PagePolicy, limit: Option<u32>, fetch: F) -> Result<Vec<T>, E>
where
    F: FnMut(PageCursor) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    let mut items = Vec::new();
    walk_pages(policy, limit, fetch, |page| items.extend(page)).await?;
    Ok(items)
}
