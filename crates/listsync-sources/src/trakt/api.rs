use listsync_models::{Credential, FilterSpec, MediaIds, MediaItem, MediaKind, Page, PageCursor};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use crate::error::RemoteError;
use crate::traits::{BatchOutcome, ListDetails, ListSummary, SearchTarget};
use super::client::RetryPolicy;

// Open range bounds are filled with these when rendering query params
const YEAR_BOUNDS: (u32, u32) = (1800, 2100);
const RUNTIME_BOUNDS: (u32, u32) = (0, 1000);
const RATING_BOUNDS: (u32, u32) = (0, 100);

/// Everything a Trakt call needs besides its own arguments
pub struct ApiContext<'a> {
    pub client: &'a Client,
    pub api_url: &'a str,
    pub client_id: &'a str,
    pub retry: &'a RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct TraktIds {
    trakt: Option<u64>,
    slug: Option<String>,
    imdb: Option<String>,
    tmdb: Option<u32>,
    tvdb: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TraktMedia {
    #[serde(default)]
    title: Option<String>,
    year: Option<u32>,
    ids: TraktIds,
}

/// Shape shared by search results and list items: a type tag plus the media under that key
#[derive(Debug, Deserialize)]
struct TraktEntry {
    movie: Option<TraktMedia>,
    show: Option<TraktMedia>,
}

#[derive(Debug, Deserialize)]
struct TraktListIds {
    trakt: u64,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct TraktList {
    name: String,
    ids: TraktListIds,
}

#[derive(Debug, Default, Deserialize)]
struct TraktBatchResponse {
    #[serde(default)]
    added: HashMap<String, usize>,
    #[serde(default)]
    deleted: HashMap<String, usize>,
    #[serde(default)]
    existing: HashMap<String, usize>,
    #[serde(default)]
    not_found: HashMap<String, Vec<serde_json::Value>>,
}

impl TraktBatchResponse {
    fn outcome(&self) -> BatchOutcome {
        BatchOutcome {
            changed: self.added.values().sum::<usize>() + self.deleted.values().sum::<usize>(),
            existing: self.existing.values().sum(),
            not_found: self.not_found.values().map(Vec::len).sum(),
        }
    }
}

/// Remove slashes from IMDB ID (Trakt sometimes includes them)
fn remove_slashes(s: String) -> String {
    s.replace('/', "")
}

fn to_media_item(kind: MediaKind, media: TraktMedia) -> Option<MediaItem> {
    let trakt = media.ids.trakt?;
    let ids = MediaIds {
        trakt,
        slug: media.ids.slug,
        imdb: media.ids.imdb.map(remove_slashes).filter(|id| !id.is_empty()),
        tmdb: media.ids.tmdb,
        tvdb: media.ids.tvdb,
    };
    Some(MediaItem::new(kind, media.title.unwrap_or_default(), media.year, ids))
}

fn entries_to_items(kind: MediaKind, entries: Vec<TraktEntry>) -> Vec<MediaItem> {
    let mut items = Vec::with_capacity(entries.len());
    let mut skipped = 0;

    for entry in entries {
        let media = match kind {
            MediaKind::Movie => entry.movie,
            MediaKind::Show => entry.show,
        };
        match media.and_then(|m| to_media_item(kind, m)) {
            Some(item) => items.push(item),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(kind = %kind, skipped, "Skipped Trakt entries without a {} payload or trakt id", kind);
    }
    items
}

fn total_pages(headers: &HeaderMap) -> u32 {
    headers
        .get("X-Pagination-Page-Count")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(1)
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get("Retry-After")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Wait before the next attempt: the server's `Retry-After` when given, never past the policy cap
fn retry_delay(policy: &RetryPolicy, attempt: u32, retry_after: Option<Duration>) -> Duration {
    retry_after
        .map(|wait| wait.min(policy.max_delay))
        .unwrap_or_else(|| policy.delay_for(attempt))
}

fn join_set(values: &std::collections::BTreeSet<String>) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().map(String::as_str).collect::<Vec<_>>().join(","))
    }
}

/// Query parameters for `GET /search/{type}`
fn search_params(target: &SearchTarget<'_>, filter: &FilterSpec, cursor: PageCursor) -> Vec<(&'static str, String)> {
    let mut params = vec![("query", filter.query.clone())];

    if !filter.search_fields.is_empty() {
        let fields: Vec<&str> = filter.search_fields.iter().map(|f| f.as_str()).collect();
        params.push(("fields", fields.join(",")));
    }
    if let Some(years) = filter.years.to_param(YEAR_BOUNDS.0, YEAR_BOUNDS.1) {
        params.push(("years", years));
    }
    if let Some(genres) = join_set(&filter.genres) {
        params.push(("genres", genres));
    }
    if let Some(languages) = join_set(&filter.languages) {
        params.push(("languages", languages));
    }
    if let Some(countries) = join_set(&filter.countries) {
        params.push(("countries", countries));
    }
    if let Some(runtimes) = filter.runtimes.to_param(RUNTIME_BOUNDS.0, RUNTIME_BOUNDS.1) {
        params.push(("runtimes", runtimes));
    }
    if let Some(ratings) = filter.ratings.to_param(RATING_BOUNDS.0, RATING_BOUNDS.1) {
        params.push(("ratings", ratings));
    }
    if let SearchTarget::Shows { certifications, networks } = target {
        if let Some(certifications) = join_set(certifications) {
            params.push(("certifications", certifications));
        }
        if let Some(networks) = join_set(networks) {
            params.push(("networks", networks));
        }
    }

    params.push(("extended", "full".to_string()));
    params.extend(page_params(cursor));
    params
}

fn page_params(cursor: PageCursor) -> Vec<(&'static str, String)> {
    let mut params = vec![("page", cursor.page.to_string())];
    if let Some(limit) = cursor.limit {
        params.push(("limit", limit.to_string()));
    }
    params
}

/// `{"movies": [{"ids": {...}}], "shows": [...]}` for batch list item calls
fn batch_payload(items: &[MediaItem]) -> serde_json::Value {
    let mut payload = serde_json::Map::new();

    for kind in [MediaKind::Movie, MediaKind::Show] {
        let entries: Vec<serde_json::Value> = items
            .iter()
            .filter(|item| item.kind == kind)
            .map(|item| serde_json::json!({ "ids": item.ids }))
            .collect();
        payload.insert(kind.plural().to_string(), serde_json::Value::Array(entries));
    }

    serde_json::Value::Object(payload)
}

fn list_body(details: &ListDetails) -> serde_json::Value {
    serde_json::json!({
        "name": details.name,
        "description": details.description,
        "privacy": details.privacy.as_str(),
        "display_numbers": details.display_numbers,
        "allow_comments": details.allow_comments
    })
}

fn request(ctx: &ApiContext<'_>, method: Method, path: &str, access_token: &str) -> RequestBuilder {
    ctx.client
        .request(method, format!("{}{}", ctx.api_url, path))
        .header("Authorization", format!("Bearer {}", access_token))
        .header("trakt-api-version", "2")
        .header("trakt-api-key", ctx.client_id)
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
}

/// Send a request, retrying transient failures per the retry policy.
///
/// Non-idempotent calls are only retried on 429, where the remote refused the
/// request before acting on it.
async fn send(
    ctx: &ApiContext<'_>,
    operation: &'static str,
    idempotent: bool,
    build: impl Fn() -> RequestBuilder,
) -> Result<Response, RemoteError> {
    let mut attempt: u32 = 0;

    loop {
        let (error, wait) = match build().send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                let status = response.status().as_u16();
                let wait = retry_after(response.headers());
                let body = response.text().await.unwrap_or_default();
                (RemoteError::Status { operation, status, body }, wait)
            }
            Err(source) => (RemoteError::Transport { operation, source }, None),
        };

        let retryable = if idempotent {
            error.is_transient()
        } else {
            error.status() == Some(429)
        };
        if !retryable || attempt >= ctx.retry.max_retries {
            return Err(error);
        }

        let delay = retry_delay(ctx.retry, attempt, wait);
        attempt += 1;
        warn!(
            operation,
            attempt,
            max_retries = ctx.retry.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Transient Trakt failure, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

async fn decode<T: DeserializeOwned>(operation: &'static str, response: Response) -> Result<T, RemoteError> {
    response
        .json::<T>()
        .await
        .map_err(|e| RemoteError::Decode { operation, message: e.to_string() })
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).to_string()
}

/// Username slug of the account an access token belongs to
pub async fn get_username(ctx: &ApiContext<'_>, access_token: &str) -> Result<String, RemoteError> {
    const OPERATION: &str = "get user profile";

    let response = send(ctx, OPERATION, true, || request(ctx, Method::GET, "/users/me", access_token)).await?;
    let json: serde_json::Value = decode(OPERATION, response).await?;
    json["ids"]["slug"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| RemoteError::Decode {
            operation: OPERATION,
            message: "Missing username slug".to_string(),
        })
}

/// One page of `GET /search/{movie|show}`
pub async fn search(
    ctx: &ApiContext<'_>,
    credential: &Credential,
    target: SearchTarget<'_>,
    filter: &FilterSpec,
    cursor: PageCursor,
) -> Result<Page<MediaItem>, RemoteError> {
    const OPERATION: &str = "search";

    let kind = target.kind();
    let path = format!("/search/{}", kind.as_str());
    let params = search_params(&target, filter, cursor);

    let response = send(ctx, OPERATION, true, || {
        request(ctx, Method::GET, &path, &credential.access_token).query(&params)
    })
    .await?;

    let total_pages = total_pages(response.headers());
    let entries: Vec<TraktEntry> = decode(OPERATION, response).await?;
    let items = entries_to_items(kind, entries);

    debug!(
        kind = %kind,
        page = cursor.page,
        total_pages,
        items_on_page = items.len(),
        "Trakt search page"
    );

    Ok(Page::new(items, cursor.page, total_pages))
}

/// One page of `GET /users/{owner}/lists/{id}/items/{movie|show}`
pub async fn list_items(
    ctx: &ApiContext<'_>,
    credential: &Credential,
    owner: &str,
    list_id: u64,
    kind: MediaKind,
    cursor: PageCursor,
) -> Result<Page<MediaItem>, RemoteError> {
    const OPERATION: &str = "get list items";

    let path = format!("/users/{}/lists/{}/items/{}", encode(owner), list_id, kind.as_str());
    let mut params = vec![("extended", "full".to_string())];
    params.extend(page_params(cursor));

    let response = send(ctx, OPERATION, true, || {
        request(ctx, Method::GET, &path, &credential.access_token).query(&params)
    })
    .await?;

    let total_pages = total_pages(response.headers());
    let entries: Vec<TraktEntry> = decode(OPERATION, response).await?;
    let items = entries_to_items(kind, entries);

    debug!(
        list_id,
        kind = %kind,
        page = cursor.page,
        total_pages,
        items_on_page = items.len(),
        "Trakt list items page"
    );

    Ok(Page::new(items, cursor.page, total_pages))
}

pub async fn get_list(
    ctx: &ApiContext<'_>,
    credential: &Credential,
    owner: &str,
    id: u64,
) -> Result<ListSummary, RemoteError> {
    const OPERATION: &str = "get list";

    let path = format!("/users/{}/lists/{}", encode(owner), id);
    let response = send(ctx, OPERATION, true, || request(ctx, Method::GET, &path, &credential.access_token)).await?;
    let list: TraktList = decode(OPERATION, response).await?;
    Ok(summary(list))
}

pub async fn create_list(
    ctx: &ApiContext<'_>,
    credential: &Credential,
    owner: &str,
    details: &ListDetails,
) -> Result<ListSummary, RemoteError> {
    const OPERATION: &str = "create list";

    let path = format!("/users/{}/lists", encode(owner));
    let body = list_body(details);
    let response = send(ctx, OPERATION, false, || {
        request(ctx, Method::POST, &path, &credential.access_token).json(&body)
    })
    .await?;
    let list: TraktList = decode(OPERATION, response).await?;
    Ok(summary(list))
}

pub async fn update_list(
    ctx: &ApiContext<'_>,
    credential: &Credential,
    owner: &str,
    id: u64,
    details: &ListDetails,
) -> Result<ListSummary, RemoteError> {
    const OPERATION: &str = "update list";

    let path = format!("/users/{}/lists/{}", encode(owner), id);
    let body = list_body(details);
    let response = send(ctx, OPERATION, true, || {
        request(ctx, Method::PUT, &path, &credential.access_token).json(&body)
    })
    .await?;
    let list: TraktList = decode(OPERATION, response).await?;
    Ok(summary(list))
}

pub async fn delete_list(
    ctx: &ApiContext<'_>,
    credential: &Credential,
    owner: &str,
    list_id: u64,
) -> Result<(), RemoteError> {
    const OPERATION: &str = "delete list";

    let path = format!("/users/{}/lists/{}", encode(owner), list_id);
    send(ctx, OPERATION, true, || request(ctx, Method::DELETE, &path, &credential.access_token)).await?;
    Ok(())
}

pub async fn add_list_items(
    ctx: &ApiContext<'_>,
    credential: &Credential,
    owner: &str,
    list_id: u64,
    items: &[MediaItem],
) -> Result<BatchOutcome, RemoteError> {
    const OPERATION: &str = "add list items";

    let path = format!("/users/{}/lists/{}/items", encode(owner), list_id);
    post_batch(ctx, OPERATION, &path, credential, items).await
}

pub async fn remove_list_items(
    ctx: &ApiContext<'_>,
    credential: &Credential,
    owner: &str,
    list_id: u64,
    items: &[MediaItem],
) -> Result<BatchOutcome, RemoteError> {
    const OPERATION: &str = "remove list items";

    let path = format!("/users/{}/lists/{}/items/remove", encode(owner), list_id);
    post_batch(ctx, OPERATION, &path, credential, items).await
}

async fn post_batch(
    ctx: &ApiContext<'_>,
    operation: &'static str,
    path: &str,
    credential: &Credential,
    items: &[MediaItem],
) -> Result<BatchOutcome, RemoteError> {
    let payload = batch_payload(items);
    let response = send(ctx, operation, true, || {
        request(ctx, Method::POST, path, &credential.access_token).json(&payload)
    })
    .await?;
    let batch: TraktBatchResponse = decode(operation, response).await?;
    let outcome = batch.outcome();

    if outcome.not_found > 0 {
        warn!(operation, not_found = outcome.not_found, "Trakt did not recognise some list items");
    }
    Ok(outcome)
}

fn summary(list: TraktList) -> ListSummary {
    ListSummary {
        id: list.ids.trakt,
        slug: list.ids.slug,
        name: list.name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use listsync_models::{Range, SearchField};
    use std::collections::BTreeSet;

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_search_params_for_movies_skip_show_filters() {
        let filter = FilterSpec {
            query: "heist".to_string(),
            search_fields: [SearchField::Title, SearchField::Overview].into_iter().collect(),
            years: Range::between(2000, 2020),
            genres: set(&["action", "crime"]),
            certifications: set(&["TV-MA"]),
            networks: set(&["HBO"]),
            ..FilterSpec::default()
        };
        let params = search_params(&SearchTarget::for_kind(MediaKind::Movie, &filter), &filter, PageCursor::first(Some(100)));

        assert_eq!(param(&params, "query"), Some("heist"));
        assert_eq!(param(&params, "fields"), Some("title,overview"));
        assert_eq!(param(&params, "years"), Some("2000-2020"));
        assert_eq!(param(&params, "genres"), Some("action,crime"));
        assert_eq!(param(&params, "page"), Some("1"));
        assert_eq!(param(&params, "limit"), Some("100"));
        assert_eq!(param(&params, "certifications"), None);
        assert_eq!(param(&params, "networks"), None);
        assert_eq!(param(&params, "runtimes"), None);
    }

    #[test]
    fn test_search_params_for_shows_include_show_filters() {
        let filter = FilterSpec {
            ratings: Range::new(Some(70), None),
            certifications: set(&["TV-14", "TV-MA"]),
            networks: set(&["HBO"]),
            ..FilterSpec::default()
        };
        let params = search_params(&SearchTarget::for_kind(MediaKind::Show, &filter), &filter, PageCursor::first(None));

        assert_eq!(param(&params, "certifications"), Some("TV-14,TV-MA"));
        assert_eq!(param(&params, "networks"), Some("HBO"));
        assert_eq!(param(&params, "ratings"), Some("70-100"));
        assert_eq!(param(&params, "limit"), None);
    }

    #[test]
    fn test_entries_to_items_picks_kind_and_skips_missing_ids() {
        let entries: Vec<TraktEntry> = serde_json::from_value(serde_json::json!([
            { "type": "movie", "score": 10.0, "movie": { "title": "Heat", "year": 1995, "ids": { "trakt": 1, "slug": "heat-1995", "imdb": "/tt0113277" } } },
            { "type": "movie", "movie": { "title": "Unknown", "year": null, "ids": { "slug": "unknown" } } },
            { "type": "show", "show": { "title": "The Wire", "year": 2002, "ids": { "trakt": 2 } } }
        ]))
        .unwrap();

        let items = entries_to_items(MediaKind::Movie, entries);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Heat");
        assert_eq!(items[0].ids.trakt, 1);
        assert_eq!(items[0].ids.imdb.as_deref(), Some("tt0113277"));
    }

    #[test]
    fn test_batch_payload_groups_by_kind() {
        let items = vec![
            MediaItem::new(MediaKind::Movie, "Heat", Some(1995), MediaIds::trakt(1)),
            MediaItem::new(MediaKind::Show, "The Wire", Some(2002), MediaIds::trakt(2)),
        ];
        let payload = batch_payload(&items);
        assert_eq!(payload["movies"], serde_json::json!([{ "ids": { "trakt": 1 } }]));
        assert_eq!(payload["shows"], serde_json::json!([{ "ids": { "trakt": 2 } }]));
    }

    #[test]
    fn test_batch_response_outcome() {
        let response: TraktBatchResponse = serde_json::from_value(serde_json::json!({
            "added": { "movies": 2, "shows": 0, "seasons": 0, "people": 0 },
            "existing": { "movies": 1, "shows": 0 },
            "not_found": { "movies": [{ "ids": { "trakt": 9 } }], "shows": [] },
            "list": { "updated_at": "2026-01-01T00:00:00.000Z", "item_count": 3 }
        }))
        .unwrap();
        assert_eq!(
            response.outcome(),
            BatchOutcome { changed: 2, existing: 1, not_found: 1 }
        );
    }

    #[test]
    fn test_retry_after_is_capped_by_policy() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        };
        assert_eq!(retry_delay(&policy, 0, Some(Duration::from_secs(3600))), Duration::from_secs(30));
        assert_eq!(retry_delay(&policy, 0, Some(Duration::from_secs(2))), Duration::from_secs(2));
        assert_eq!(retry_delay(&policy, 1, None), Duration::from_millis(1000));

        let mut headers = HeaderMap::new();
        headers.insert("Retry-After", "3600".parse().unwrap());
        assert_eq!(retry_delay(&policy, 0, retry_after(&headers)), Duration::from_secs(30));
    }

    #[test]
    fn test_batch_payload_keeps_empty_kinds() {
        let payload = batch_payload(&[MediaItem::new(MediaKind::Show, "The Wire", Some(2002), MediaIds::trakt(2))]);
        assert_eq!(payload, serde_json::json!({ "movies": [], "shows": [{ "ids": { "trakt": 2 } }] }));
    }

    #[test]
    fn test_total_pages_defaults_to_one() {
        let mut headers = HeaderMap::new();
        assert_eq!(total_pages(&headers), 1);
        headers.insert("X-Pagination-Page-Count", "7".parse().unwrap());
        assert_eq!(total_pages(&headers), 7);
    }
}
