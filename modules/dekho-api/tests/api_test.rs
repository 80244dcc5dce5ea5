//! Router tests against the in-memory store.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use dekho_api::{router, AppState};
use dekho_common::{Ad, AdTarget, AdVariant, Collection, Config, PageSeo};
use dekho_store::MemoryStore;

const ANON: &str = "Bearer anon-test-key";
const SERVICE: &str = "Bearer service-test-key";

fn app(store: Arc<MemoryStore>) -> Router {
    router(Arc::new(AppState::new(Config::for_tests(), store)))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_lead(auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/functions/v1/save-lead")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn ad(title: &str, target: AdTarget, priority: i32) -> Ad {
    Ad {
        id: Uuid::new_v4(),
        title: title.to_string(),
        subtitle: None,
        cta_text: None,
        link_url: "https://dekhocampus.com/apply".to_string(),
        image_url: None,
        variant: AdVariant::Horizontal,
        position: None,
        target,
        page_name: None,
        item_slug: None,
        city: None,
        priority,
        is_active: true,
    }
}

// =========================================================================
// Health and CORS
// =========================================================================

#[tokio::test]
async fn health_check_and_cors_headers() {
    let app = app(Arc::new(MemoryStore::new()));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::ORIGIN, "https://dekhocampus.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
}

#[tokio::test]
async fn preflight_is_answered_without_auth() {
    let app = app(Arc::new(MemoryStore::new()));
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/functions/v1/save-lead")
                .header(header::ORIGIN, "https://dekhocampus.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization, content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

// =========================================================================
// Leads
// =========================================================================

#[tokio::test]
async fn save_lead_stores_blank_email_as_null() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store.clone());

    let (status, body) = send(
        &app,
        post_lead(
            Some(ANON),
            json!({"name": "Asha", "phone": "9999999999", "email": ""}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let leads = store.leads().await;
    assert_eq!(leads.len(), 1);
    assert_eq!(body["id"], leads[0].id.to_string());
    assert_eq!(leads[0].email, None);
    assert_eq!(leads[0].source, "website");
}

#[tokio::test]
async fn save_lead_requires_project_key() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store.clone());
    let lead = json!({"name": "Asha", "phone": "9999999999"});

    let (status, _) = send(&app, post_lead(None, lead.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, post_lead(Some("Bearer wrong"), lead)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert!(store.leads().await.is_empty());
}

#[tokio::test]
async fn save_lead_rejects_invalid_input() {
    let app = app(Arc::new(MemoryStore::new()));

    let (status, body) = send(&app, post_lead(Some(ANON), json!({"name": "Asha", "phone": "12"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, post_lead(Some(ANON), json!({"phone": "9999999999"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn save_lead_reports_store_failure() {
    let store = Arc::new(MemoryStore::new());
    store.set_failing(true);
    let app = app(store);

    let (status, body) = send(
        &app,
        post_lead(Some(ANON), json!({"name": "Asha", "phone": "9999999999"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to save lead"}));
}

#[tokio::test]
async fn save_lead_is_rate_limited_per_client() {
    let app = app(Arc::new(MemoryStore::new()));
    let lead = json!({"name": "Asha", "phone": "9999999999"});

    let request = |ip: &str| {
        let mut request = post_lead(Some(ANON), lead.clone());
        request
            .headers_mut()
            .insert("x-forwarded-for", ip.parse().unwrap());
        request
    };

    for _ in 0..dekho_api::rest::leads::RATE_LIMIT_PER_HOUR {
        let (status, _) = send(&app, request("203.0.113.7")).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = send(&app, request("203.0.113.7")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let (status, _) = send(&app, request("203.0.113.8")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn recent_leads_need_service_key() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store);
    send(
        &app,
        post_lead(Some(ANON), json!({"name": "Asha", "phone": "9999999999"})),
    )
    .await;

    let admin_get = |auth: &str| {
        Request::builder()
            .uri("/api/admin/leads?limit=5")
            .header(header::AUTHORIZATION, auth)
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = send(&app, admin_get(ANON)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, admin_get(SERVICE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leads"].as_array().unwrap().len(), 1);
    assert_eq!(body["leads"][0]["name"], "Asha");
}

// =========================================================================
// Ads
// =========================================================================

#[tokio::test]
async fn page_and_city_ad_beats_higher_priority_universal() {
    let store = Arc::new(MemoryStore::new());
    store.put_ad(ad("Everywhere", AdTarget::Universal, 100)).await;
    store
        .put_ad(Ad {
            page_name: Some("colleges".to_string()),
            city: Some("Pune".to_string()),
            ..ad("Pune colleges", AdTarget::Page, 1)
        })
        .await;
    let app = app(store);

    let (status, body) = send(
        &app,
        get("/api/ads/resolve?page=colleges&city=pune&variant=horizontal"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ad"]["title"], "Pune colleges");

    let (_, body) = send(&app, get("/api/ads/resolve?page=exams&variant=horizontal")).await;
    assert_eq!(body["ad"]["title"], "Everywhere");
}

#[tokio::test]
async fn no_matching_ad_is_null() {
    let store = Arc::new(MemoryStore::new());
    store
        .put_ad(Ad {
            page_name: Some("colleges".to_string()),
            ..ad("Colleges only", AdTarget::Page, 1)
        })
        .await;
    let app = app(store);

    let (status, body) = send(&app, get("/api/ads/resolve?page=exams")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ad": null}));
}

#[tokio::test]
async fn ad_variant_is_optional_and_case_insensitive() {
    let store = Arc::new(MemoryStore::new());
    store.put_ad(ad("Wide", AdTarget::Universal, 1)).await;
    let app = app(store);

    let (status, body) = send(&app, get("/api/ads/resolve?page=exams&variant=")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ad"]["title"], "Wide");

    let (status, body) = send(&app, get("/api/ads/resolve?page=exams&variant=Horizontal")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ad"]["title"], "Wide");

    let (status, body) = send(&app, get("/api/ads/resolve?variant=SQUARE")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ad": null}));

    let (status, body) = send(&app, get("/api/ads/resolve?variant=banner")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

// =========================================================================
// Listings
// =========================================================================

async fn colleges_store(count: u32) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .put_rows(
            Collection::Colleges,
            (0..count).map(|i| {
                json!({
                    "id": format!("c{i:02}"),
                    "name": format!("College {i}"),
                    "city": if i % 2 == 0 { "Pune" } else { "Mumbai" },
                    "rating": f64::from(count - i),
                })
            }),
        )
        .await;
    store
}

#[tokio::test]
async fn listing_pages_until_short_page() {
    let app = app(colleges_store(3).await);

    let (status, first) = send(&app, get("/api/listings/colleges?limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["items"].as_array().unwrap().len(), 2);
    assert_eq!(first["items"][0]["id"], "c00");
    assert_eq!(first["has_more"], true);
    assert_eq!(first["next_offset"], 2);

    let (_, second) = send(&app, get("/api/listings/colleges?limit=2&offset=2")).await;
    assert_eq!(second["items"].as_array().unwrap().len(), 1);
    assert_eq!(second["items"][0]["id"], "c02");
    assert_eq!(second["has_more"], false);
    assert_eq!(second["next_offset"], Value::Null);
}

#[tokio::test]
async fn listing_filters_and_rejections() {
    let app = app(colleges_store(6).await);

    let (_, body) = send(&app, get("/api/listings/colleges?city=Mumbai")).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|r| r["city"] == "Mumbai"));

    let (status, _) = send(&app, get("/api/listings/dorms")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, get("/api/listings/colleges?owner_email=x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("owner_email"));
}

// =========================================================================
// SEO
// =========================================================================

#[tokio::test]
async fn seo_uses_base_path_record() {
    let store = Arc::new(MemoryStore::new());
    store
        .put_page_seo(PageSeo {
            page_path: "/colleges".to_string(),
            meta_title: Some("Top Colleges".to_string()),
            meta_description: Some("Compare colleges".to_string()),
            ..Default::default()
        })
        .await;
    let app = app(store);

    let (status, body) = send(&app, get("/api/seo?path=/colleges/iit-bombay")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["base_path"], "/colleges");
    assert_eq!(body["resolved"]["title"], "Top Colleges");
    assert_eq!(body["resolved"]["og_description"], "Compare colleges");

    let head = body["head"].as_str().unwrap();
    assert!(head.contains("<title>Top Colleges | DekhoCampus</title>"));
    assert!(head.contains("<meta name=\"twitter:card\" content=\"summary\">"));
}

#[tokio::test]
async fn seo_explicit_values_win_and_lookup_failure_is_tolerated() {
    let store = Arc::new(MemoryStore::new());
    store.set_failing(true);
    let app = app(store);

    let (status, body) = send(&app, get("/api/seo?path=/exams&title=JEE%20Main")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resolved"]["title"], "JEE Main");
    assert_eq!(body["resolved"]["description"], Value::Null);
}

// =========================================================================
// Calculators
// =========================================================================

#[tokio::test]
async fn calculators_compute_and_validate() {
    let app = app(Arc::new(MemoryStore::new()));

    let (status, body) = send(&app, get("/api/calculators/bmi?weight=70&height=175")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], 22.9);
    assert_eq!(body["category"], "normal");

    let (_, body) = send(&app, get("/api/calculators/percentage?obtained=450&total=500")).await;
    assert_eq!(body["percentage"], 90.0);

    let (status, _) = send(&app, get("/api/calculators/emi?principal=100000&rate=9")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/api/calculators/bmi?weight=70&height=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/api/calculators/horoscope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn calculators_reject_results_that_overflow() {
    let app = app(Arc::new(MemoryStore::new()));

    let (status, body) = send(
        &app,
        get("/api/calculators/sip?monthly=5000&rate=12&years=4294967295"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("out of range"));

    let (status, body) = send(
        &app,
        get("/api/calculators/emi?principal=1000&rate=12&months=4000000000"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(&app, get("/api/calculators/sip?monthly=5000&rate=12&years=10")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["invested"], 600000.0);
    assert!(body["total_value"].as_f64().unwrap() > 600000.0);
}
