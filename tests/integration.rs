use axum::body::Body;
use chrono::{TimeZone, Utc};
use content_gateway::fields::{FieldDefinition, FieldType};
use content_gateway::routes::build_router;
use content_gateway::store::{
    MediaRecord, MemoryStore, PostRecord, PostStatus, StaticSchemaProvider, TermRecord, TypeRecord,
    UserRecord,
};
use content_gateway::{AppState, ContentVisibility, GatewayConfig};
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tower::ServiceExt;

fn seeded_state() -> Arc<AppState> {
    let store = Arc::new(MemoryStore::new());
    store.insert_type(TypeRecord {
        slug: "article".to_string(),
        name: "Articles".to_string(),
        singular: "Article".to_string(),
        rest_base: "articles".to_string(),
        hierarchical: false,
    });
    store.insert_type(TypeRecord {
        slug: "block_template".to_string(),
        name: "Block Templates".to_string(),
        singular: "Block Template".to_string(),
        rest_base: "block-templates".to_string(),
        hierarchical: false,
    });
    store.insert_user(UserRecord {
        id: 10,
        name: "Eddie Editor".to_string(),
        email: "eddie@example.com".to_string(),
        roles: vec!["editor".to_string()],
    });
    store.register_taxonomy("topic");
    store.insert_term(TermRecord {
        id: 100,
        name: "Rust".to_string(),
        slug: "rust".to_string(),
        taxonomy: "topic".to_string(),
        count: 2,
    });

    for id in 1..=5u64 {
        let mut fields = serde_json::Map::new();
        fields.insert("subtitle".to_string(), json!(format!("Subtitle {id}")));
        if id == 1 {
            fields.insert("secret".to_string(), json!("internal only"));
        }
        store.insert_post(PostRecord {
            id,
            post_type: "article".to_string(),
            title: format!("Article {id}"),
            slug: format!("article-{id}"),
            status: PostStatus::Published,
            content: format!("Body of article {id}"),
            excerpt: String::new(),
            date: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).single().unwrap()
                + chrono::Duration::hours(id as i64),
            modified: None,
            author_id: 10,
            thumbnail_id: None,
            fields,
        });
    }

    let provider = Arc::new(StaticSchemaProvider::new());
    provider.set_definitions(
        "article",
        vec![
            FieldDefinition {
                name: "subtitle".to_string(),
                label: "Subtitle".to_string(),
                field_type: FieldType::Text,
                ..Default::default()
            },
            FieldDefinition {
                name: "price".to_string(),
                label: "Price".to_string(),
                field_type: FieldType::Number,
                min: Some(0.0),
                max: Some(100.0),
                ..Default::default()
            },
            FieldDefinition {
                name: "secret".to_string(),
                label: "Secret".to_string(),
                field_type: FieldType::Text,
                wrapper_class: Some("hide-in-app".to_string()),
                ..Default::default()
            },
        ],
    );

    let config = GatewayConfig::default();
    Arc::new(AppState::new(
        config,
        store,
        provider,
        ContentVisibility::default(),
    ))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get_as(uri: &str, user_id: u64, roles: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-auth-user-id", user_id.to_string())
        .header("x-auth-user-name", "Test User")
        .header("x-auth-roles", roles)
        .body(Body::empty())
        .unwrap()
}

fn send_as(method: &str, uri: &str, user_id: u64, roles: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-auth-user-id", user_id.to_string())
        .header("x-auth-user-name", "Test User")
        .header("x-auth-roles", roles)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn json_body(resp: http::Response<Body>) -> (StatusCode, JsonValue) {
    let status = resp.status();
    let bytes = resp
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    let json: JsonValue = serde_json::from_slice(&bytes).expect("valid JSON response");
    (status, json)
}

#[tokio::test]
async fn version_is_public_and_lists_capabilities() {
    let app = build_router(seeded_state());
    let (status, json) = json_body(app.oneshot(get("/version")).await.unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["capabilities"]["cursor_pagination"], json!(true));
    assert_eq!(json["capabilities"]["batch_operations"], json!(true));
    assert_eq!(json["capabilities"]["audit_log"], json!(true));
}

#[tokio::test]
async fn health_reports_all_checks_ok() {
    let app = build_router(seeded_state());
    let (status, json) = json_body(app.oneshot(get("/health")).await.unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["checks"]["database"], json!(true));
    assert_eq!(json["checks"]["schemaProvider"], json!(true));
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let app = build_router(seeded_state());
    let (status, json) = json_body(app.oneshot(get("/me")).await.unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "unauthorized");
}

#[tokio::test]
async fn role_outside_allowlist_is_forbidden() {
    let app = build_router(seeded_state());
    let (status, json) =
        json_body(app.oneshot(get_as("/me", 20, "subscriber")).await.unwrap()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "forbidden");
}

#[tokio::test]
async fn me_reflects_identity() {
    let app = build_router(seeded_state());
    let (status, json) = json_body(app.oneshot(get_as("/me", 10, "editor")).await.unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], 10);
    assert_eq!(json["is_admin"], json!(false));
}

#[tokio::test]
async fn create_rejects_out_of_range_field() {
    let app = build_router(seeded_state());
    let request = send_as(
        "POST",
        "/posts/article",
        10,
        "editor",
        json!({"title": "Hello", "fields": {"price": 999}}),
    );
    let (status, json) = json_body(app.oneshot(request).await.unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "validation_failed");
    assert_eq!(json["errors"]["price"], json!(["Value must be at most 100."]));
}

#[tokio::test]
async fn create_then_fetch_full_post() {
    let state = seeded_state();
    let app = build_router(state);
    let request = send_as(
        "POST",
        "/posts/article",
        10,
        "editor",
        json!({"title": "Hello", "fields": {"price": 12.5}}),
    );
    let (status, created) = json_body(app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_u64().unwrap();

    let (status, full) = json_body(
        app.oneshot(get_as(&format!("/post/{id}"), 10, "editor"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(full["fields"]["price"]["value"], json!(12.5));
    assert!(full["field_order"]
        .as_array()
        .unwrap()
        .contains(&json!("price")));
}

#[tokio::test]
async fn cursor_pages_do_not_overlap() {
    let app = build_router(seeded_state());
    let (status, first) = json_body(
        app.clone()
            .oneshot(get_as("/posts/article?per_page=2", 10, "editor"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["page"], json!(1));
    let first_ids: Vec<u64> = first["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_u64().unwrap())
        .collect();
    let cursor = first["next_cursor"].as_str().expect("cursor on full page");

    let (status, second) = json_body(
        app.oneshot(get_as(
            &format!("/posts/article?per_page=2&cursor={cursor}"),
            10,
            "editor",
        ))
        .await
        .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // cursor mode: no page/pages in the response
    assert!(second.get("page").is_none());
    assert!(second.get("pages").is_none());
    let second_ids: Vec<u64> = second["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_u64().unwrap())
        .collect();
    assert_eq!(first_ids, vec![5, 4]);
    assert_eq!(second_ids, vec![3, 2]);
}

#[tokio::test]
async fn oversized_batch_fails_wholesale() {
    let app = build_router(seeded_state());
    let ops: Vec<JsonValue> = (0..51)
        .map(|_| json!({"method": "GET", "path": "/post/1"}))
        .collect();
    let request = send_as("POST", "/batch", 10, "editor", json!({"operations": ops}));
    let (status, json) = json_body(app.oneshot(request).await.unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "too_many_operations");
}

#[tokio::test]
async fn batch_reports_independent_failures() {
    let app = build_router(seeded_state());
    let mut ops: Vec<JsonValue> = (0..49)
        .map(|_| json!({"method": "GET", "path": "/post/1"}))
        .collect();
    ops.push(json!({"method": "GET", "path": "/post/9999"}));
    let request = send_as("POST", "/batch", 10, "editor", json!({"operations": ops}));
    let (status, json) = json_body(app.oneshot(request).await.unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["summary"], json!({"total": 50, "success": 49, "errors": 1}));
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 50);
    assert_eq!(results[49]["success"], json!(false));
    assert_eq!(results[49]["error"]["code"], "not_found");
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let app = build_router(seeded_state());
    let request = send_as("POST", "/batch", 10, "editor", json!({"operations": []}));
    let (status, json) = json_body(app.oneshot(request).await.unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "no_operations");
}

#[tokio::test]
async fn hidden_fields_never_surface() {
    let app = build_router(seeded_state());

    let (_, full) = json_body(
        app.clone()
            .oneshot(get_as("/post/1", 10, "editor"))
            .await
            .unwrap(),
    )
    .await;
    assert!(full["fields"].get("secret").is_none());

    let (_, schema) = json_body(
        app.clone()
            .oneshot(get_as("/fields/article", 10, "editor"))
            .await
            .unwrap(),
    )
    .await;
    assert!(schema["fields"].get("secret").is_none());
    assert!(!schema["fieldOrder"]
        .as_array()
        .unwrap()
        .contains(&json!("secret")));

    let (_, list) = json_body(
        app.oneshot(get_as("/posts/article?fields=secret,subtitle", 10, "editor"))
            .await
            .unwrap(),
    )
    .await;
    for post in list["posts"].as_array().unwrap() {
        assert!(post["fields"].get("secret").is_none());
    }
}

#[tokio::test]
async fn delete_invalidates_cached_post() {
    let app = build_router(seeded_state());

    let (status, _) = json_body(
        app.clone()
            .oneshot(get_as("/post/2", 10, "editor"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let request = send_as("DELETE", "/post/2", 10, "editor", json!({}));
    let (status, deleted) = json_body(app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["deleted"], json!(true));

    let (status, _) = json_body(app.oneshot(get_as("/post/2", 10, "editor")).await.unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn audit_log_is_admin_only_and_records_mutations() {
    let app = build_router(seeded_state());

    let request = send_as(
        "POST",
        "/posts/article",
        1,
        "administrator",
        json!({"title": "Audited", "fields": {}}),
    );
    let (status, _) = json_body(app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = json_body(
        app.clone()
            .oneshot(get_as("/audit-log", 10, "editor"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, log) = json_body(
        app.oneshot(get_as("/audit-log", 1, "administrator"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entries = log["entries"].as_array().unwrap();
    assert!(!entries.is_empty());
    assert_eq!(entries[0]["action"], "create");
    assert_eq!(entries[0]["object_title"], "Audited");
}

#[tokio::test]
async fn cache_clear_requires_admin() {
    let app = build_router(seeded_state());
    let request = send_as("POST", "/cache/clear", 10, "editor", json!({}));
    let (status, _) = json_body(app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let request = send_as("POST", "/cache/clear", 1, "administrator", json!({}));
    let (status, json) = json_body(app.oneshot(request).await.unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["cleared"].is_u64());
}

#[tokio::test]
async fn unknown_taxonomy_returns_empty_set() {
    let app = build_router(seeded_state());
    let (status, json) = json_body(
        app.clone()
            .oneshot(get_as("/terms/nonexistent", 10, "editor"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["terms"], json!([]));
    assert_eq!(json["total"], 0);

    let (status, json) = json_body(
        app.oneshot(get_as("/terms/topic", 10, "editor"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["terms"][0]["slug"], "rust");
}

#[tokio::test]
async fn unknown_search_type_returns_empty_set() {
    let app = build_router(seeded_state());
    let (status, json) = json_body(
        app.oneshot(get_as("/search/ghost?q=article", 10, "editor"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["posts"], json!([]));
    assert_eq!(json["total"], 0);
}

#[tokio::test]
async fn internal_types_are_partitioned() {
    let app = build_router(seeded_state());
    let (_, types) = json_body(
        app.clone()
            .oneshot(get_as("/types", 10, "editor"))
            .await
            .unwrap(),
    )
    .await;
    let slugs: Vec<&str> = types["types"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["slug"].as_str().unwrap())
        .collect();
    assert!(slugs.contains(&"article"));
    assert!(!slugs.contains(&"block_template"));

    let (_, hidden) = json_body(
        app.oneshot(get_as("/hidden-types", 10, "editor"))
            .await
            .unwrap(),
    )
    .await;
    let hidden_slugs: Vec<&str> = hidden["types"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["slug"].as_str().unwrap())
        .collect();
    assert_eq!(hidden_slugs, vec!["block_template"]);
}

#[tokio::test]
async fn app_access_is_tracked_and_revocable() {
    let app = build_router(seeded_state());

    for _ in 0..2 {
        let request = Request::builder()
            .method("GET")
            .uri("/me")
            .header("x-auth-user-id", "10")
            .header("x-auth-roles", "editor")
            .header("x-auth-app-id", "phone-1")
            .header("x-auth-app-name", "Field App")
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        let (status, _) = json_body(app.clone().oneshot(request).await.unwrap()).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, apps) = json_body(
        app.clone()
            .oneshot(get_as("/apps", 1, "administrator"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(apps["total"], 1);
    assert_eq!(apps["apps"][0]["access_count"], 2);
    assert_eq!(apps["apps"][0]["last_ip"], "203.0.113.9");

    let request = Request::builder()
        .method("DELETE")
        .uri("/apps/10/phone-1")
        .header("x-auth-user-id", "1")
        .header("x-auth-roles", "administrator")
        .body(Body::empty())
        .unwrap();
    let (status, removed) = json_body(app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["removed"], json!(true));

    let (_, apps) = json_body(
        app.oneshot(get_as("/apps", 1, "administrator"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(apps["total"], 0);
}

#[tokio::test]
async fn update_records_changed_fields() {
    let app = build_router(seeded_state());
    let request = send_as(
        "POST",
        "/post/3",
        10,
        "editor",
        json!({"title": "Renamed", "fields": {"price": 50}}),
    );
    let (status, updated) = json_body(app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Renamed");
    assert_eq!(updated["fields"]["price"]["value"], json!(50));

    let (_, log) = json_body(
        app.oneshot(get_as("/audit-log?action=update", 1, "administrator"))
            .await
            .unwrap(),
    )
    .await;
    let changes = log["entries"][0]["changes"].as_array().unwrap();
    assert!(changes.contains(&json!("title")));
    assert!(changes.contains(&json!("price")));
}

#[tokio::test]
async fn schema_change_reaches_cached_fields_endpoint() {
    // built inline so the provider handle stays in reach
    let store = Arc::new(MemoryStore::new());
    store.insert_type(TypeRecord {
        slug: "article".to_string(),
        name: "Articles".to_string(),
        singular: "Article".to_string(),
        rest_base: "articles".to_string(),
        hierarchical: false,
    });
    let provider = Arc::new(StaticSchemaProvider::new());
    provider.set_definitions(
        "article",
        vec![FieldDefinition {
            name: "subtitle".to_string(),
            field_type: FieldType::Text,
            ..Default::default()
        }],
    );
    let state = Arc::new(AppState::new(
        GatewayConfig::default(),
        store,
        provider.clone(),
        ContentVisibility::default(),
    ));
    let app = build_router(state);

    let (_, first) = json_body(
        app.clone()
            .oneshot(get_as("/fields/article", 10, "editor"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(first["fieldOrder"], json!(["subtitle"]));

    provider.set_definitions(
        "article",
        vec![
            FieldDefinition {
                name: "subtitle".to_string(),
                field_type: FieldType::Text,
                ..Default::default()
            },
            FieldDefinition {
                name: "byline".to_string(),
                field_type: FieldType::Text,
                ..Default::default()
            },
        ],
    );

    // the cached body for the old revision must not be served
    let (_, second) = json_body(
        app.oneshot(get_as("/fields/article", 10, "editor"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(second["fieldOrder"], json!(["subtitle", "byline"]));
}

#[tokio::test]
async fn media_cursor_pages_do_not_overlap() {
    let store = Arc::new(MemoryStore::new());
    for id in 1..=5u64 {
        store.insert_media(MediaRecord {
            id,
            url: format!("/media/{id}/shot-{id}.jpg"),
            filename: format!("shot-{id}.jpg"),
            filesize: 2048,
            mime_type: "image/jpeg".to_string(),
            alt: String::new(),
            title: String::new(),
            sizes: Default::default(),
            uploaded: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).single().unwrap()
                + chrono::Duration::minutes(id as i64),
        });
    }
    let state = Arc::new(AppState::new(
        GatewayConfig::default(),
        store,
        Arc::new(StaticSchemaProvider::new()),
        ContentVisibility::default(),
    ));
    let app = build_router(state);

    let (status, first) = json_body(
        app.clone()
            .oneshot(get_as("/media?per_page=2", 10, "editor"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["page"], 1);
    assert_eq!(first["total"], 5);
    let mut seen: Vec<u64> = first["media"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_u64().unwrap())
        .collect();

    let mut cursor = first["next_cursor"]
        .as_str()
        .expect("cursor on full page")
        .to_string();
    loop {
        let (_, page) = json_body(
            app.clone()
                .oneshot(get_as(
                    &format!("/media?per_page=2&cursor={cursor}"),
                    10,
                    "editor",
                ))
                .await
                .unwrap(),
        )
        .await;
        assert!(page.get("page").is_none());
        assert!(page.get("pages").is_none());
        for m in page["media"].as_array().unwrap() {
            seen.push(m["id"].as_u64().unwrap());
        }
        match page["next_cursor"].as_str() {
            Some(next) => cursor = next.to_string(),
            None => break,
        }
    }
    // newest first, no gaps, no duplicates
    assert_eq!(seen, vec![5, 4, 3, 2, 1]);
}
