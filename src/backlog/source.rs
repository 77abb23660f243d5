use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tracing::Instrument;

use crate::telemetry;
use crate::telemetry::ops::process::Phase as ProcessPhase;
use crate::youtube::{ApiError, ListedVideo, VideoApi, VideoDetails, MAX_IDS_PER_DETAILS_CALL, MAX_PAGE_SIZE};

use super::quota::{QuotaCosts, QuotaLedger};
use super::retry::{metered, Metered, RetryPolicy};
use super::types::{Visibility, VideoRecord};

/// One item of a channel listing.
#[derive(Clone, Debug, PartialEq)]
pub enum Discovery {
    Video(VideoRecord),
    /// The budget ran out; at most `unexamined` more videos were left.
    QuotaDeferred { unexamined: usize },
}

/// Lazy, paginated view over one channel's uploads.
///
/// Pages are fetched on demand, one remote call each, and the page token is
/// kept across errors so a retry resumes at the failed page. Details for a
/// page are coalesced into as few `videos.list` calls as the API allows.
pub struct ChannelListing<'a> {
    api: &'a dyn VideoApi,
    ledger: &'a QuotaLedger,
    costs: QuotaCosts,
    retry: RetryPolicy,
    request_timeout: Duration,
    channel_id: String,
    max_items: usize,
    yielded: usize,
    buffer: VecDeque<VideoRecord>,
    next_token: Option<String>,
    pages: usize,
    deferred: bool,
    finished: bool,
}

enum PageFetch {
    Loaded,
    QuotaRefused,
}

impl<'a> ChannelListing<'a> {
    pub fn new(
        api: &'a dyn VideoApi,
        ledger: &'a QuotaLedger,
        costs: QuotaCosts,
        retry: RetryPolicy,
        request_timeout: Duration,
        channel_id: impl Into<String>,
        max_items: usize,
    ) -> Self {
        Self {
            api,
            ledger,
            costs,
            retry,
            request_timeout,
            channel_id: channel_id.into(),
            max_items,
            yielded: 0,
            buffer: VecDeque::new(),
            next_token: None,
            pages: 0,
            deferred: false,
            finished: false,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    pub async fn next(&mut self) -> Result<Option<Discovery>, ApiError> {
        loop {
            if self.finished || self.yielded >= self.max_items {
                self.finished = true;
                return Ok(None);
            }
            if let Some(video) = self.buffer.pop_front() {
                self.yielded += 1;
                return Ok(Some(Discovery::Video(video)));
            }
            if self.deferred {
                self.finished = true;
                return Ok(Some(Discovery::QuotaDeferred { unexamined: self.max_items - self.yielded }));
            }
            if self.pages > 0 && self.next_token.is_none() {
                self.finished = true;
                return Ok(None);
            }
            if let PageFetch::QuotaRefused = self.fetch_page().await? {
                self.deferred = true;
            }
        }
    }

    async fn fetch_page(&mut self) -> Result<PageFetch, ApiError> {
        let log = telemetry::process();
        let wanted = (self.max_items - self.yielded).min(MAX_PAGE_SIZE);
        let token = self.next_token.clone();

        let span = log.span_kv(&ProcessPhase::ListPage, [
            ("channel_id", self.channel_id.clone()),
            ("page", self.pages.to_string()),
        ]);
        let api = self.api;
        let channel_id = self.channel_id.as_str();
        let res = metered(self.ledger, self.costs.list, self.retry, self.request_timeout, "list", || {
            api.list_videos(channel_id, token.as_deref(), wanted)
        })
        .instrument(span)
        .await;
        let page = match res {
            Metered::Done { value, .. } => value,
            Metered::Deferred { .. } => return Ok(PageFetch::QuotaRefused),
            Metered::Failed { error, .. } => return Err(error),
        };

        let mut listed = page.videos;
        listed.truncate(wanted);
        let resolved = self
            .resolve_details(&listed)
            .instrument(log.span(&ProcessPhase::Details))
            .await?;

        let mut quota_refused = false;
        for chunk in listed.chunks(MAX_IDS_PER_DETAILS_CALL) {
            match resolved.get(chunk_key(chunk)) {
                Some(details) => {
                    for item in chunk {
                        let record = self.record(item, details.get(&item.id));
                        self.buffer.push_back(record);
                    }
                }
                None => {
                    quota_refused = true;
                    break;
                }
            }
        }

        // a page whose details could not be read stays unconsumed
        if quota_refused {
            return Ok(PageFetch::QuotaRefused);
        }
        self.pages += 1;
        self.next_token = page.next_page_token;
        log.debug_kv("📄 page loaded", [
            ("channel_id", self.channel_id.clone()),
            ("videos", listed.len().to_string()),
            ("more", self.next_token.is_some().to_string()),
        ]);
        Ok(PageFetch::Loaded)
    }

    /// Details keyed by chunk start id; a missing chunk means its lookup was
    /// refused by the ledger.
    async fn resolve_details(
        &self,
        listed: &[ListedVideo],
    ) -> Result<HashMap<String, HashMap<String, VideoDetails>>, ApiError> {
        let mut out = HashMap::new();
        for chunk in listed.chunks(MAX_IDS_PER_DETAILS_CALL) {
            let ids: Vec<String> = chunk.iter().map(|v| v.id.clone()).collect();
            let api = self.api;
            let res = metered(self.ledger, self.costs.details, self.retry, self.request_timeout, "details", || {
                api.video_details(&ids)
            })
            .await;
            match res {
                Metered::Done { value, .. } => {
                    let by_id = value.into_iter().map(|d| (d.id.clone(), d)).collect();
                    out.insert(chunk_key(chunk).to_string(), by_id);
                }
                Metered::Deferred { .. } => break,
                Metered::Failed { error, .. } => return Err(error),
            }
        }
        Ok(out)
    }

    fn record(&self, listed: &ListedVideo, details: Option<&VideoDetails>) -> VideoRecord {
        match details {
            Some(d) => VideoRecord {
                id: listed.id.clone(),
                channel_id: self.channel_id.clone(),
                title: d.title.clone(),
                visibility: d.visibility,
                published_at: d.published_at,
                is_live: d.is_live,
            },
            // listed but not readable: nothing to act on
            None => VideoRecord {
                id: listed.id.clone(),
                channel_id: self.channel_id.clone(),
                title: None,
                visibility: Visibility::Unknown,
                published_at: listed.published_at,
                is_live: false,
            },
        }
    }
}

fn chunk_key(chunk: &[ListedVideo]) -> &str {
    chunk.first().map(|v| v.id.as_str()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::youtube::mock::{stream, upload, MockApi, MockCall};
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    const CHANNEL: &str = "UCaaaaaaaaaaaaaaaaaaaaaa";

    fn videos(n: usize) -> Vec<VideoDetails> {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| stream(&format!("v{i}"), base - ChronoDuration::hours(i as i64), Visibility::Public))
            .collect()
    }

    fn listing<'a>(api: &'a MockApi, ledger: &'a QuotaLedger, max: usize) -> ChannelListing<'a> {
        ChannelListing::new(api, ledger, QuotaCosts::default(), RetryPolicy::default(), Duration::from_secs(5), CHANNEL, max)
    }

    async fn drain(listing: &mut ChannelListing<'_>) -> Vec<Discovery> {
        let mut out = Vec::new();
        while let Some(item) = listing.next().await.unwrap() {
            out.push(item);
        }
        out
    }

    #[tokio::test]
    async fn yields_in_listing_order_across_pages() {
        let api = MockApi::new().with_channel(CHANNEL, videos(120));
        let ledger = QuotaLedger::new(1_000);
        let mut l = listing(&api, &ledger, 120);
        let items = drain(&mut l).await;

        let ids: Vec<String> = items
            .iter()
            .map(|d| match d { Discovery::Video(v) => v.id.clone(), other => panic!("unexpected {other:?}") })
            .collect();
        let expected: Vec<String> = (0..120).map(|i| format!("v{i}")).collect();
        assert_eq!(ids, expected);
        assert_eq!(l.pages_fetched(), 3);
        // one list + one coalesced details call per page
        assert_eq!(api.list_calls(), 3);
        assert_eq!(api.details_calls(), 3);
        assert_eq!(ledger.spent(), 6);
    }

    #[tokio::test]
    async fn stops_at_max_items() {
        let api = MockApi::new().with_channel(CHANNEL, videos(30));
        let ledger = QuotaLedger::new(100);
        let mut l = listing(&api, &ledger, 7);
        assert_eq!(drain(&mut l).await.len(), 7);
        assert!(api.calls().contains(&MockCall::List { channel_id: CHANNEL.into(), page_token: None }));
        assert_eq!(api.list_calls(), 1);
    }

    #[tokio::test]
    async fn quota_refusal_ends_sequence_with_deferral() {
        let api = MockApi::new().with_channel(CHANNEL, videos(80));
        // first page (list + details) fits, second list call does not
        let ledger = QuotaLedger::new(2);
        let mut l = listing(&api, &ledger, 80);
        let items = drain(&mut l).await;

        assert_eq!(items.len(), 51);
        assert_eq!(items.last(), Some(&Discovery::QuotaDeferred { unexamined: 30 }));
        assert_eq!(ledger.spent(), 2);
        assert!(ledger.is_exhausted());
    }

    #[tokio::test]
    async fn refused_details_leave_page_unexamined() {
        let api = MockApi::new().with_channel(CHANNEL, videos(10));
        let ledger = QuotaLedger::new(1);
        let mut l = listing(&api, &ledger, 10);
        let items = drain(&mut l).await;
        assert_eq!(items, vec![Discovery::QuotaDeferred { unexamined: 10 }]);
    }

    #[tokio::test]
    async fn missing_details_yield_unknown_non_live_record() {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let api = MockApi::new().with_channel(CHANNEL, vec![
            upload("u1", base, Visibility::Public),
            stream("gone", base, Visibility::Public),
        ]);
        api.hide_details("gone");
        let ledger = QuotaLedger::new(10);
        let mut l = listing(&api, &ledger, 5);
        let items = drain(&mut l).await;
        assert_eq!(items.len(), 2);
        match &items[1] {
            Discovery::Video(v) => {
                assert_eq!(v.id, "gone");
                assert_eq!(v.visibility, Visibility::Unknown);
                assert!(!v.is_live);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn inaccessible_channel_surfaces_error() {
        let api = MockApi::new().with_channel_error(CHANNEL, ApiError::Forbidden("channel".into()));
        let ledger = QuotaLedger::new(10);
        let mut l = listing(&api, &ledger, 5);
        assert_eq!(l.next().await, Err(ApiError::Forbidden("channel".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_details_failure_retries_same_page_only() {
        let api = MockApi::new().with_channel(CHANNEL, videos(60));
        api.fail_next_details(ApiError::Server { status: 500 });
        let ledger = QuotaLedger::new(100);
        let mut l = listing(&api, &ledger, 60);
        assert_eq!(drain(&mut l).await.len(), 60);
        assert_eq!(api.list_calls(), 2);
        assert_eq!(api.details_calls(), 3);
    }
}
