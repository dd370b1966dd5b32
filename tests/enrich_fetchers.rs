// tests/enrich_fetchers.rs
mod common;

use common::{FakeHttp, CROSSREF, S2};
use paper_feed::enrich::{AbstractFetcher, MetadataError, MetadataFetcher};
use paper_feed::http::{FetchFailure, HttpFetch};
use paper_feed::Doi;
use std::sync::Arc;

fn doi(s: &str) -> Doi {
    Doi::find_in(s).unwrap()
}

fn abstracts(http: &Arc<FakeHttp>) -> AbstractFetcher {
    let fetch: Arc<dyn HttpFetch> = http.clone();
    AbstractFetcher::new(fetch, S2, None, CROSSREF)
}

const UNIXSD: &str = r#"<?xml version="1.0"?>
<crossref_result><query_result><body><crossref><journal><journal_article>
<jats:abstract xmlns:jats="http://www.ncbi.nlm.nih.gov/JATS1">
<jats:title>Abstract</jats:title><jats:p>From the registry.</jats:p>
</jats:abstract></journal_article></journal></crossref></body></query_result></crossref_result>"#;

fn s2_url(d: &str) -> String {
    format!("{S2}/graph/v1/paper/DOI:{d}?fields=abstract")
}

fn xml_url(d: &str) -> String {
    format!("{CROSSREF}/works/{d}/transform/application/vnd.crossref.unixsd+xml")
}

#[tokio::test]
async fn semantic_scholar_wins_when_present() {
    let http = FakeHttp::new();
    http.get_ok(&s2_url("10.1000/a"), r#"{"paperId":"x","abstract":"  From S2. "}"#);
    http.get_ok(&xml_url("10.1000/a"), UNIXSD);
    assert_eq!(abstracts(&http).fetch(&doi("10.1000/a")).await, "From S2.");
    assert_eq!(http.calls_to(CROSSREF), 0);
}

#[tokio::test]
async fn falls_back_to_registry_xml() {
    let http = FakeHttp::new();
    http.get_ok(&s2_url("10.1000/b"), r#"{"paperId":"x","abstract":null}"#);
    http.get_ok(&xml_url("10.1000/b"), UNIXSD);
    assert_eq!(abstracts(&http).fetch(&doi("10.1000/b")).await, "From the registry.");
}

#[tokio::test]
async fn s2_failure_still_tries_registry() {
    let http = FakeHttp::new();
    http.get_fail(&s2_url("10.1000/c"), FetchFailure::Timeout);
    http.get_ok(&xml_url("10.1000/c"), UNIXSD);
    assert_eq!(abstracts(&http).fetch(&doi("10.1000/c")).await, "From the registry.");
}

#[tokio::test]
async fn no_abstract_anywhere_is_empty_string() {
    let http = FakeHttp::new();
    http.get_status(&s2_url("10.1000/d"), 404, r#"{"error":"not found"}"#);
    http.get_ok(&xml_url("10.1000/d"), "<crossref_result><journal_article/></crossref_result>");
    assert_eq!(abstracts(&http).fetch(&doi("10.1000/d")).await, "");
}

#[tokio::test]
async fn both_sources_failing_is_empty_string() {
    let http = FakeHttp::new();
    http.get_ok(&s2_url("10.1000/f"), "{ not json");
    http.get_fail(&xml_url("10.1000/f"), FetchFailure::Timeout);
    assert_eq!(abstracts(&http).fetch(&doi("10.1000/f")).await, "");

    http.get_ok(&s2_url("10.1000/g"), r#"{"paperId":"x","abstract":null}"#);
    http.get_fail(
        &xml_url("10.1000/g"),
        FetchFailure::Transport("connection reset".into()),
    );
    assert_eq!(abstracts(&http).fetch(&doi("10.1000/g")).await, "");

    http.get_fail(&s2_url("10.1000/h"), FetchFailure::Timeout);
    http.get_status(&xml_url("10.1000/h"), 503, "");
    assert_eq!(abstracts(&http).fetch(&doi("10.1000/h")).await, "");
}

#[tokio::test]
async fn primary_hit_never_touches_failing_registry() {
    let http = FakeHttp::new();
    http.get_ok(&s2_url("10.1000/i"), r#"{"abstract":"Primary text."}"#);
    http.get_fail(&xml_url("10.1000/i"), FetchFailure::Timeout);
    assert_eq!(abstracts(&http).fetch(&doi("10.1000/i")).await, "Primary text.");
    assert_eq!(http.calls_to(CROSSREF), 0);
}

#[tokio::test]
async fn metadata_maps_crossref_record() {
    let http = FakeHttp::new();
    http.crossref_work("10.1000/e", "A Title");
    let fetch: Arc<dyn HttpFetch> = http.clone();
    let meta = MetadataFetcher::new(fetch, CROSSREF)
        .fetch(&doi("10.1000/e"))
        .await
        .unwrap();
    assert_eq!(meta.title, "A Title");
    assert_eq!(meta.journal, "Journal of Tests");
    assert_eq!(meta.authors, vec!["Ada Lovelace".to_string()]);
    assert_eq!(meta.year, Some(2024));
    assert_eq!(meta.pages, "1-9");
}

#[tokio::test]
async fn metadata_failures_are_typed() {
    let http = FakeHttp::new();
    http.get_ok(&format!("{CROSSREF}/works/10.1000/bad"), "not json");
    http.get_fail(&format!("{CROSSREF}/works/10.1000/slow"), FetchFailure::Timeout);
    let fetch: Arc<dyn HttpFetch> = http.clone();
    let m = MetadataFetcher::new(fetch, CROSSREF);

    assert!(matches!(
        m.fetch(&doi("10.1000/missing")).await,
        Err(MetadataError::Status(404))
    ));
    assert!(matches!(
        m.fetch(&doi("10.1000/bad")).await,
        Err(MetadataError::Malformed(_))
    ));
    assert!(matches!(
        m.fetch(&doi("10.1000/slow")).await,
        Err(MetadataError::Transport(FetchFailure::Timeout))
    ));
}
