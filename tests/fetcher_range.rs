// Range queries: paging, local filtering and failure mapping.
mod common;

use common::{FakeSource, at, item, range};
use edcal::error::SchedulerError;
use edcal::fetcher::EventFetcher;
use edcal::model::{ContentType, DateRange, Status, StatusFilter};

fn posts() -> ContentType {
    ContentType::new("post", "posts", "Posts")
}

#[tokio::test]
async fn drains_every_page_before_returning() {
    let source = FakeSource::new((1..=5).map(|id| item(id, id as u32, 9, Status::Publish)).collect());
    let fetcher = EventFetcher::new(source.clone(), 2, 50);

    let events = fetcher
        .fetch(&posts(), &StatusFilter::default(), &range(1, 31))
        .await
        .unwrap();

    assert_eq!(events.len(), 5);
    let pages: Vec<u32> = source.queries().iter().map(|q| q.page).collect();
    assert_eq!(pages, vec![1, 2, 3]);
    let ids: Vec<u64> = events.iter().map(|e| e.source_item_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    assert_eq!(events[0].id, "posts-1");
}

#[tokio::test]
async fn empty_filter_returns_nothing_without_a_request() {
    let source = FakeSource::new(vec![item(1, 3, 9, Status::Draft)]);
    let fetcher = EventFetcher::new(source.clone(), 100, 50);

    let events = fetcher
        .fetch(&posts(), &StatusFilter::empty(), &range(1, 31))
        .await
        .unwrap();

    assert!(events.is_empty());
    assert_eq!(source.query_count(), 0);
}

#[tokio::test]
async fn only_events_inside_range_and_filter_are_returned() {
    // The fake ignores bounds and statuses here, so everything it returns
    // must be filtered locally.
    let source = FakeSource::new(vec![
        item(1, 9, 23, Status::Publish),
        item(2, 10, 0, Status::Publish),
        item(3, 12, 12, Status::Draft),
        item(4, 14, 23, Status::Future),
        item(5, 15, 0, Status::Future),
    ]);
    source.set_lenient_bounds();
    let fetcher = EventFetcher::new(source.clone(), 100, 50);

    let window = DateRange::new(at(10, 0), at(14, 23)).unwrap();
    let filter = StatusFilter::from_statuses([Status::Publish, Status::Future]);
    let events = fetcher.fetch(&posts(), &filter, &window).await.unwrap();

    let ids: Vec<u64> = events.iter().map(|e| e.source_item_id).collect();
    assert_eq!(ids, vec![2, 4]);
    assert!(events.iter().all(|e| window.contains(e.start) && filter.contains(e.status)));
}

#[tokio::test]
async fn query_carries_filter_and_widened_bounds() {
    let source = FakeSource::new(vec![item(1, 10, 0, Status::Draft)]);
    let fetcher = EventFetcher::new(source.clone(), 100, 50);
    let window = DateRange::new(at(10, 0), at(10, 0)).unwrap();

    let events = fetcher
        .fetch(&posts(), &StatusFilter::from_statuses([Status::Draft]), &window)
        .await
        .unwrap();
    assert_eq!(events.len(), 1, "an item exactly on both endpoints is included");

    let query = &source.queries()[0];
    assert_eq!(query.statuses, vec![Status::Draft]);
    assert!(query.after < window.start());
    assert!(query.before > window.end());
    assert_eq!(query.content_type.rest_base, "posts");
}

#[tokio::test]
async fn transport_failure_is_fetch_failed() {
    let source = FakeSource::new(vec![item(1, 3, 9, Status::Draft)]);
    let window = range(1, 31);
    source.fail_query(&window);
    let fetcher = EventFetcher::new(source.clone(), 100, 50);

    let err = fetcher
        .fetch(&posts(), &StatusFilter::default(), &window)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::FetchFailed(msg) if msg.contains("connection reset")));
}

#[tokio::test]
async fn too_many_pages_fails_instead_of_truncating() {
    let source = FakeSource::new((1..=5).map(|id| item(id, id as u32, 9, Status::Publish)).collect());
    let fetcher = EventFetcher::new(source.clone(), 1, 2);

    let err = fetcher
        .fetch(&posts(), &StatusFilter::default(), &range(1, 31))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::FetchFailed(_)));
    assert_eq!(source.query_count(), 2);
}
