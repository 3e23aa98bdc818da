use lineage_catalog::{
    CatalogClient, ClassType, InMemoryCatalog, RawItem, RawLink, SearchFilters,
    SYNONYM_ASSOCIATION,
};
use lineage_core::{CatalogConfig, CatalogError};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

const FLOW: &str = "core.DirectionalDataFlow";

fn config(max_retries: u32) -> CatalogConfig {
    CatalogConfig {
        max_retries,
        retry_backoff_ms: 0,
        ..Default::default()
    }
}

fn client_over(catalog: &Arc<InMemoryCatalog>, max_retries: u32) -> CatalogClient {
    CatalogClient::new(catalog.clone(), &config(max_retries))
}

fn customer_catalog() -> Arc<InMemoryCatalog> {
    Arc::new(InMemoryCatalog::with_items([
        RawItem::new("dwh/CUSTOMER")
            .named("CUSTOMER")
            .with_class_type("com.infa.ldm.relational.Table")
            .with_fact("core.description", "Customer master")
            .with_src_link(RawLink::to("stg/CUSTOMER").association(FLOW))
            .with_dst_link(RawLink::to("mart/CUSTOMER_V").association(FLOW)),
        RawItem::new("stg/CUSTOMER")
            .named("STG_CUSTOMER")
            .with_class_type("com.infa.ldm.relational.Table"),
        RawItem::new("mart/CUSTOMER_V")
            .named("CUSTOMER_V")
            .with_class_type("com.infa.ldm.relational.View"),
    ]))
}

#[tokio::test]
async fn test_second_fetch_is_served_from_cache() {
    let catalog = customer_catalog();
    let client = client_over(&catalog, 3);

    let first = assert_ok!(client.fetch("dwh/CUSTOMER").await);
    let second = assert_ok!(client.fetch_traced("dwh/CUSTOMER").await);

    assert!(second.cache_hit);
    assert!(Arc::ptr_eq(&first, &second.record));
    assert_eq!(catalog.calls_for("dwh/CUSTOMER"), 1);
    assert_eq!(first.description, "Customer master");

    let stats = client.statistics();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(client.cache_len(), 1);
}

#[tokio::test]
async fn test_empty_result_yields_unfound_record() {
    let catalog = customer_catalog();
    let client = client_over(&catalog, 3);

    let record = client.fetch("nowhere/GHOST").await.unwrap();
    assert!(!record.found);
    assert_eq!(record.class_type, "unknown");
    assert_eq!(record.name, "GHOST");
    assert!(record.src_links.is_empty());
    assert!(record.dst_links.is_empty());

    assert_eq!(client.statistics().empty_responses, 1);
    assert!(client.is_cached("nowhere/GHOST"));
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let catalog = customer_catalog();
    catalog.fail_times("dwh/CUSTOMER", 2);
    let client = client_over(&catalog, 3);

    let record = client.fetch("dwh/CUSTOMER").await.unwrap();
    assert!(record.found);
    assert_eq!(catalog.calls_for("dwh/CUSTOMER"), 3);

    let stats = client.statistics();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.retries, 2);
    assert_eq!(stats.api_errors, 0);
}

#[tokio::test]
async fn test_exhausted_retries_report_unavailable() {
    let catalog = customer_catalog();
    catalog.fail_always("dwh/CUSTOMER");
    let client = client_over(&catalog, 2);

    let err = assert_err!(client.fetch("dwh/CUSTOMER").await);
    match err {
        CatalogError::Unavailable { asset, attempts, .. } => {
            assert_eq!(asset, "dwh/CUSTOMER");
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(catalog.calls_for("dwh/CUSTOMER"), 3);
    assert_eq!(client.statistics().api_errors, 1);
    assert!(!client.is_cached("dwh/CUSTOMER"));
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let catalog = customer_catalog();
    catalog.fail_always("dwh/CUSTOMER");
    catalog.fail_with_status(404);
    let client = client_over(&catalog, 3);

    let err = client.fetch("dwh/CUSTOMER").await.unwrap_err();
    assert!(matches!(err, CatalogError::Unavailable { attempts: 1, .. }));
    assert_eq!(catalog.calls_for("dwh/CUSTOMER"), 1);
    assert_eq!(client.statistics().retries, 0);
}

#[tokio::test]
async fn test_synonym_and_invalid_links_are_counted() {
    let catalog = Arc::new(InMemoryCatalog::with_items([RawItem::new("a/A")
        .named("A")
        .with_src_link(RawLink::to("a/S1").association(SYNONYM_ASSOCIATION))
        .with_src_link(RawLink::to("a/B").association(FLOW))
        .with_src_link(RawLink::to("a/S2").association(SYNONYM_ASSOCIATION))
        .with_src_link(RawLink::dangling().association(FLOW))
        .with_src_link(RawLink::to("a/C").association(FLOW))
        .with_src_link(RawLink::to("a/S3").association(SYNONYM_ASSOCIATION))]));
    let client = client_over(&catalog, 0);

    let outcome = client.fetch_traced("a/A").await.unwrap();
    let targets: Vec<&str> = outcome
        .record
        .src_links
        .iter()
        .map(|l| l.target_id.as_str())
        .collect();
    assert_eq!(targets, vec!["a/B", "a/C"]);
    assert_eq!(outcome.filtered.synonyms, 3);
    assert_eq!(outcome.filtered.invalid, 1);

    let again = client.fetch_traced("a/A").await.unwrap();
    assert!(again.filtered.is_zero());

    let stats = client.statistics();
    assert_eq!(stats.synonyms_filtered, 3);
    assert_eq!(stats.invalid_links, 1);
}

#[tokio::test]
async fn test_upstream_and_downstream_links() {
    let catalog = customer_catalog();
    let client = client_over(&catalog, 0);

    let upstream = client.upstream("dwh/CUSTOMER").await.unwrap();
    let downstream = client.downstream("dwh/CUSTOMER").await.unwrap();

    assert_eq!(upstream.len(), 1);
    assert_eq!(upstream[0].target_name, "CUSTOMER");
    assert_eq!(downstream[0].target_id, "mart/CUSTOMER_V");
    assert_eq!(catalog.calls_for("dwh/CUSTOMER"), 1);
}

#[tokio::test]
async fn test_search_bypasses_cache() {
    let catalog = customer_catalog();
    let client = client_over(&catalog, 0);

    let filters = SearchFilters::new().with_class_types([ClassType::Table]);
    let results = client.search("*customer*", &filters).await.unwrap();

    let mut ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["dwh/CUSTOMER", "stg/CUSTOMER"]);
    assert_eq!(client.cache_len(), 0);
    assert_eq!(client.statistics().total_requests, 0);
}

#[tokio::test]
async fn test_concurrent_fetches_share_one_record() {
    let catalog = customer_catalog();
    let client = Arc::new(client_over(&catalog, 0));

    let (a, b) = futures::join!(client.fetch("dwh/CUSTOMER"), client.fetch("dwh/CUSTOMER"));
    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    assert_eq!(client.cache_len(), 1);
}

#[tokio::test]
async fn test_overlapping_misses_make_one_request() {
    let catalog = Arc::new(InMemoryCatalog::with_items([RawItem::new("a/T")
        .named("T")
        .with_src_link(RawLink::to("a/S").association(SYNONYM_ASSOCIATION))
        .with_src_link(RawLink::to("a/U").association(FLOW))]));
    catalog.set_latency(Duration::from_millis(50));
    let client = client_over(&catalog, 0);

    let (a, b) = futures::join!(client.fetch_traced("a/T"), client.fetch_traced("a/T"));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(catalog.calls_for("a/T"), 1);
    assert!(Arc::ptr_eq(&a.record, &b.record));
    assert_ne!(a.cache_hit, b.cache_hit);
    assert_eq!(a.filtered.synonyms + b.filtered.synonyms, 1);

    let stats = client.statistics();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.synonyms_filtered, 1);
}

#[tokio::test]
async fn test_failed_fetch_can_be_retried_later() {
    let catalog = customer_catalog();
    catalog.fail_times("dwh/CUSTOMER", 1);
    let client = client_over(&catalog, 0);

    assert!(client.fetch("dwh/CUSTOMER").await.is_err());
    assert!(!client.is_cached("dwh/CUSTOMER"));
    assert_eq!(client.cache_len(), 0);

    let record = client.fetch("dwh/CUSTOMER").await.unwrap();
    assert!(record.found);
    assert_eq!(catalog.calls_for("dwh/CUSTOMER"), 2);
}

#[tokio::test]
async fn test_clear_cache_and_reset_statistics() {
    let catalog = customer_catalog();
    let client = client_over(&catalog, 0);

    client.fetch("dwh/CUSTOMER").await.unwrap();
    client.clear_cache();
    client.reset_statistics();
    client.fetch("dwh/CUSTOMER").await.unwrap();

    assert_eq!(catalog.calls_for("dwh/CUSTOMER"), 2);
    assert_eq!(client.statistics().total_requests, 1);
    assert_eq!(client.statistics().cache_hits, 0);
}
