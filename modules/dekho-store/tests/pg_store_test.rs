//! Integration tests for PgStore.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use dekho_common::{Collection, Filter, LeadSubmission, ListingQuery, PageSource};
use dekho_store::{PgStore, Store};
use sqlx::PgPool;

/// Get a migrated, empty test store, or skip if no test DB is available.
async fn test_store() -> Option<(PgStore, PgPool)> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;
    let store = PgStore::new(pool.clone());
    store.migrate().await.ok()?;

    sqlx::query("TRUNCATE colleges, ads, page_seo, leads")
        .execute(&pool)
        .await
        .ok()?;

    Some((store, pool))
}

// =========================================================================
// Listings
// =========================================================================

#[tokio::test]
async fn fetch_page_filters_searches_and_orders() {
    let Some((store, pool)) = test_store().await else {
        return;
    };
    sqlx::query(
        r#"
        INSERT INTO colleges (name, slug, city, state, rating, is_active) VALUES
            ('IIT Bombay', 'iit-bombay', 'Mumbai', 'Maharashtra', 4.9, true),
            ('VJTI', 'vjti', 'Mumbai', 'Maharashtra', 4.5, true),
            ('COEP 100%', 'coep', 'Pune', 'Maharashtra', 4.4, true),
            ('Old College', 'old', 'Mumbai', 'Maharashtra', 5.0, false)
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    let mumbai = ListingQuery::builder()
        .collection(Collection::Colleges)
        .filters(vec![Filter::eq("city", "Mumbai")])
        .build();
    let rows = store.fetch_page(&mumbai, 0).await.unwrap();
    let slugs: Vec<&str> = rows.iter().map(|r| r["slug"].as_str().unwrap()).collect();
    assert_eq!(slugs, vec!["iit-bombay", "vjti"]);

    let literal_percent = ListingQuery::builder()
        .collection(Collection::Colleges)
        .search(Some("100%".to_string()))
        .build();
    let rows = store.fetch_page(&literal_percent, 0).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["slug"], "coep");

    let second_page = ListingQuery::builder()
        .collection(Collection::Colleges)
        .page_size(2)
        .build();
    let rows = store.fetch_page(&second_page, 2).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["slug"], "coep");
}

// =========================================================================
// Ads and SEO
// =========================================================================

#[tokio::test]
async fn active_ads_and_page_seo_decode() {
    let Some((store, pool)) = test_store().await else {
        return;
    };
    sqlx::query(
        r#"
        INSERT INTO ads (title, link_url, variant, target_type, page_name, priority, is_active) VALUES
            ('Live', 'https://a.example', 'horizontal', 'page', 'colleges', 3, true),
            ('Paused', 'https://b.example', 'square', 'universal', NULL, 9, false)
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO page_seo (page_path, meta_title) VALUES ('/colleges', 'Top Colleges')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let ads = store.active_ads().await.unwrap();
    assert_eq!(ads.len(), 1);
    assert_eq!(ads[0].title, "Live");

    let seo = store.page_seo("/colleges").await.unwrap().unwrap();
    assert_eq!(seo.meta_title.as_deref(), Some("Top Colleges"));
    assert!(store.page_seo("/exams").await.unwrap().is_none());
}

// =========================================================================
// Leads
// =========================================================================

#[tokio::test]
async fn insert_lead_stores_null_email() {
    let Some((store, _pool)) = test_store().await else {
        return;
    };
    let lead = LeadSubmission {
        name: "Asha".to_string(),
        phone: "9999999999".to_string(),
        ..Default::default()
    }
    .validate()
    .unwrap();

    let id = store.insert_lead(&lead).await.unwrap();
    let leads = store.recent_leads(10).await.unwrap();

    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].id, id);
    assert_eq!(leads[0].email, None);
    assert_eq!(leads[0].source, "website");
}
