// tests/pipeline_scenarios.rs
mod common;

use common::*;
use paper_feed::ingest::cursor::{CursorStore, MemoryCursor};
use paper_feed::pipeline::ItemOutcome;
use paper_feed::sink::MemorySink;
use paper_feed::OutputRow;
use std::sync::Arc;

fn col(name: &str) -> usize {
    OutputRow::column_index(name).unwrap()
}

#[tokio::test]
async fn historical_duplicates_yield_single_row() {
    let http = FakeHttp::new();
    http.crossref_work("10.1000/xyz123", "Duplicated Paper");
    let sink = Arc::new(MemorySink::new());
    let p = pipeline_with(http.clone(), sink.clone(), options());

    let blob = "see https://doi.org/10.1000/xyz123 and duplicate https://doi.org/10.1000/xyz123";
    let summary = p.run_historical(blob).await;

    let rows = sink.snapshot();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][col("doi")], "10.1000/xyz123");
    assert_eq!(rows[0][col("title")], "Duplicated Paper");
    assert_eq!(rows[0][col("source")], "https://doi.org/10.1000/xyz123");
    assert_eq!(rows[0][col("posted_at")], "");
    assert_eq!(summary.appended, 1);
    assert_eq!(summary.duplicates, 1);
    // DOI read from the URL itself: no resolver traffic.
    assert_eq!(http.calls_to("https://doi.org"), 0);
}

#[tokio::test]
async fn same_url_three_times_in_blob_is_processed_once() {
    let http = FakeHttp::new();
    http.crossref_work("10.5555/abc", "Thrice");
    let sink = Arc::new(MemorySink::new());
    let p = pipeline_with(http.clone(), sink.clone(), options());

    let u = "https://example.org/10.5555/abc";
    let summary = p.run_historical(&format!("{u}\n{u} {u}")).await;

    assert_eq!(sink.snapshot().len(), 1);
    assert_eq!(summary.duplicates, 2);
    assert_eq!(http.calls_to(&format!("{CROSSREF}/works/")), 1);
}

#[tokio::test]
async fn unresolvable_post_is_skipped_but_cursor_advances() {
    let http = FakeHttp::new();
    let sink = Arc::new(MemorySink::new());
    let p = pipeline_with(http.clone(), sink.clone(), options());
    let feed = FakeFeed::with_posts(vec![post(42, &["https://blog.example.com/post"])]);
    let mut cursor = MemoryCursor::default();

    let (logs, _guard) = capture_logs();
    let summary = p.run_live(&feed, &mut cursor).await.unwrap();

    assert!(sink.snapshot().is_empty());
    assert_eq!(summary.unresolved, 1);
    assert_eq!(cursor.read().unwrap(), Some(42));
    assert_eq!(logs.count("no DOI found"), 1, "{:?}", logs.lines());
    assert_eq!(logs.count(" WARN "), 0, "{:?}", logs.lines());
    assert_eq!(logs.count(" ERROR "), 0, "{:?}", logs.lines());
    // HEAD then GET, nothing after.
    assert_eq!(
        http.calls(),
        vec![
            "HEAD https://blog.example.com/post".to_string(),
            "GET https://blog.example.com/post".to_string(),
        ]
    );
}

#[tokio::test]
async fn metadata_failure_skips_item_and_batch_continues() {
    let http = FakeHttp::new();
    // 10.1000/bad has no crossref record scripted → 404.
    http.crossref_work("10.1000/good", "Good Paper");
    let sink = Arc::new(MemorySink::new());
    let p = pipeline_with(http.clone(), sink.clone(), options());
    let feed = FakeFeed::with_posts(vec![
        post(7, &["https://doi.org/10.1000/bad"]),
        post(9, &["https://doi.org/10.1000/good"]),
    ]);
    let mut cursor = MemoryCursor::default();

    let summary = p.run_live(&feed, &mut cursor).await.unwrap();

    let rows = sink.snapshot();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][col("doi")], "10.1000/good");
    assert_eq!(rows[0][col("source")], "https://twitter.com/lab/status/9");
    assert_eq!(rows[0][col("posted_at")], "2025-02-03T04:05:06Z");
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.appended, 1);
    assert_eq!(cursor.read().unwrap(), Some(9));
    // No abstract lookups for the failed item.
    assert_eq!(http.calls_to(&format!("{S2}/graph/v1/paper/DOI:10.1000/bad")), 0);
}

#[tokio::test]
async fn first_live_run_uses_start_time_then_cursor() {
    let http = FakeHttp::new();
    let sink = Arc::new(MemorySink::new());
    let p = pipeline_with(http, sink, options());
    let feed = FakeFeed::with_posts(vec![post(100, &[]), post(120, &[])]);
    let mut cursor = MemoryCursor::default();

    p.run_live(&feed, &mut cursor).await.unwrap();
    p.run_live(&feed, &mut cursor).await.unwrap();

    let queries = feed.queries.lock().unwrap().clone();
    assert_eq!(queries[0].min_id, None);
    assert_eq!(queries[0].min_timestamp, Some(options().start_time));
    assert_eq!(queries[1].min_id, Some(120));
    assert_eq!(queries[1].min_timestamp, None);
    assert_eq!(cursor.read().unwrap(), Some(120));
    // Second run saw nothing new, so no second write.
    assert_eq!(cursor.writes, 1);
}

#[tokio::test]
async fn feed_failure_leaves_cursor_untouched() {
    let http = FakeHttp::new();
    let sink = Arc::new(MemorySink::new());
    let p = pipeline_with(http, sink.clone(), options());
    let mut feed = FakeFeed::with_posts(vec![post(5, &["https://doi.org/10.1000/x"])]);
    feed.fail_listing = true;
    let mut cursor = MemoryCursor {
        value: Some(3),
        writes: 0,
    };

    assert!(p.run_live(&feed, &mut cursor).await.is_err());
    assert_eq!(cursor.read().unwrap(), Some(3));
    assert!(sink.snapshot().is_empty());
}

#[tokio::test]
async fn sink_rejection_is_isolated_to_the_item() {
    let http = FakeHttp::new();
    http.crossref_work("10.1000/a", "Rejected Title");
    http.crossref_work("10.1000/b", "Accepted Title");
    let sink = Arc::new(MemorySink::rejecting("Rejected"));
    let p = pipeline_with(http, sink.clone(), options());

    let summary = p
        .run_historical("https://doi.org/10.1000/a https://doi.org/10.1000/b")
        .await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.appended, 1);
    assert_eq!(sink.snapshot()[0][col("title")], "Accepted Title");
}

#[tokio::test]
async fn sorts_only_after_appending() {
    let http = FakeHttp::new();
    http.crossref_work("10.1000/a", "A");
    let sink = Arc::new(MemorySink::new());
    let mut opts = options();
    opts.sort_column = Some(col("posted_at"));
    let p = pipeline_with(http, sink.clone(), opts);

    p.run_historical("nothing to see https://example.com/plain").await;
    assert!(sink.sorts.lock().unwrap().is_empty());

    p.run_historical("https://doi.org/10.1000/a").await;
    assert_eq!(*sink.sorts.lock().unwrap(), vec![col("posted_at")]);
}

#[tokio::test]
async fn process_link_reports_outcome() {
    let http = FakeHttp::new();
    http.crossref_work("10.1000/ok", "Fine");
    let sink = Arc::new(MemorySink::new());
    let p = pipeline_with(http, sink, options());

    let ok = paper_feed::ingest::links_from_text("https://doi.org/10.1000/ok")
        .next()
        .unwrap();
    let none = paper_feed::ingest::links_from_text("https://example.com/nothing")
        .next()
        .unwrap();
    assert_eq!(p.process_link(&ok).await, ItemOutcome::Appended);
    assert_eq!(p.process_link(&none).await, ItemOutcome::Unresolved);
}
