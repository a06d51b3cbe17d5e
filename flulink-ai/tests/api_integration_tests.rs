//! Integration tests for flulink-ai API endpoints
//!
//! Drives the full router with mock collaborators.

mod helpers;

use axum::http::StatusCode;
use flulink_ai::services::{Collection, IndexHit, RecordStore};
use helpers::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn index_with_hits() -> Arc<MockIndex> {
    Arc::new(MockIndex {
        hits: vec![
            IndexHit {
                id: "alice".to_string(),
                distance: 0.1,
                metadata: json!({"city": "shanghai"}),
            },
            IndexHit {
                id: "bob".to_string(),
                distance: 0.3,
                metadata: json!({}),
            },
            IndexHit {
                id: "carol".to_string(),
                distance: 0.8,
                metadata: json!({}),
            },
        ],
        ..MockIndex::default()
    })
}

// ============================================================================
// Health and model status
// ============================================================================

#[tokio::test]
async fn test_health_degraded_when_resources_failed() {
    let app = initialized_app(degraded_state(true)).await;
    let (status, json) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["module"], "flulink-ai");
    assert_eq!(json["fallback_enabled"], true);
    assert_eq!(json["resources"]["embedding_model"]["state"], "failed");
    assert_eq!(json["resources"]["vector_index"]["state"], "failed");
}

#[tokio::test]
async fn test_health_ok_when_resources_ready() {
    let app = initialized_app(healthy_state(index_with_hits(), None)).await;
    let (status, json) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_model_status_reports_errors_and_config() {
    let app = initialized_app(degraded_state(true)).await;
    let (status, json) = get_json(app, "/api/ai/model-status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["model_status"]["embedding_model"]["last_error"],
        "model weights unavailable"
    );
    assert_eq!(json["fallback_config"]["enable_fallback"], true);
    assert_eq!(json["fallback_config"]["fallback_vector_dim"], 64);
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_reload_returns_accepted_immediately() {
    let loader = MockModelLoader::slow(Duration::from_secs(1));
    let lifecycle = Arc::new(flulink_ai::services::ModelLifecycleManager::new(
        test_config(true),
        loader.clone(),
        MockIndexLoader::failing(),
    ));
    let state = flulink_ai::AppState::new(
        lifecycle.clone(),
        flulink_ai::services::ToxicityClassifier::local_only(),
        flulink_ai::services::SpreadPredictor::with_seed(1),
        None,
    );
    let app = flulink_ai::build_router(state);

    let started = std::time::Instant::now();
    let (status, json) = post_json(
        app,
        "/api/ai/reload-models",
        json!({"resource": "embedding_model"}),
    )
    .await;

    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["accepted"], true);
    assert_eq!(json["resources"], json!(["embedding_model"]));

    // The reload task may not have started yet; poll until it lands
    let kind = flulink_ai::services::ResourceKind::EmbeddingModel;
    for _ in 0..100 {
        if lifecycle.resource_status(kind).is_ready() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(lifecycle.resource_status(kind).is_ready());
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn test_reload_without_body_reloads_everything() {
    let app = initialized_app(degraded_state(true)).await;
    let response = {
        use axum::body::Body;
        use axum::http::Request;
        use tower::util::ServiceExt;
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/ai/reload-models")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    };
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_reload_rejects_unknown_resource() {
    let loader = MockModelLoader::ready();
    let lifecycle = Arc::new(flulink_ai::services::ModelLifecycleManager::new(
        test_config(true),
        loader.clone(),
        MockIndexLoader::failing(),
    ));
    let state = flulink_ai::AppState::new(
        lifecycle.clone(),
        flulink_ai::services::ToxicityClassifier::local_only(),
        flulink_ai::services::SpreadPredictor::with_seed(1),
        None,
    );

    let (status, json) = post_json(
        flulink_ai::build_router(state),
        "/api/ai/reload-models",
        json!({"resource": "gpu"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");

    // Nothing was scheduled
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(loader.calls(), 0);
    assert_eq!(
        lifecycle
            .resource_status(flulink_ai::services::ResourceKind::EmbeddingModel)
            .state,
        flulink_ai::services::LoadState::Uninitialized
    );
}

// ============================================================================
// Embedding and similarity
// ============================================================================

#[tokio::test]
async fn test_embed_serves_fallback_when_model_failed() {
    let app = initialized_app(degraded_state(true)).await;
    let (status, json) = post_json(app, "/api/ai/embed-text", json!({"text": "今天很开心"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["model_used"], "fallback");
    assert_eq!(json["dimension"], 64);
    assert_eq!(json["vector"].as_array().unwrap().len(), 64);
}

#[tokio::test]
async fn test_embed_unavailable_when_fallback_disabled() {
    let app = initialized_app(degraded_state(false)).await;
    let (status, json) = post_json(app, "/api/ai/embed-text", json!({"text": "hello"})).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"]["code"], "RESOURCE_UNAVAILABLE");
}

#[tokio::test]
async fn test_embed_serves_primary_when_ready() {
    let app = initialized_app(healthy_state(index_with_hits(), None)).await;
    let (status, json) = post_json(app, "/api/ai/embed-text", json!({"text": "hello"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["model_used"], "primary");
    assert_eq!(json["dimension"], 3);
}

#[tokio::test]
async fn test_find_similar_fallback_ranks_pool() {
    let app = initialized_app(degraded_state(true)).await;
    let body = json!({
        "seed_vector": [1.0, 0.0],
        "user_pool": [
            {"id": "orthogonal", "interest_vector": [0.0, 1.0]},
            {"id": "same", "interest_vector": [2.0, 0.0]},
            {"id": "close", "interest_vector": [1.0, 0.2]},
            {"id": "no-vector"}
        ],
        "limit": 5,
        "min_similarity": 0.5
    });

    let (status, json) = post_json(app, "/api/ai/find-similar-users", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["model_used"], "fallback");
    let ids: Vec<&str> = json["similar_users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["same", "close"]);
}

#[tokio::test]
async fn test_find_similar_primary_uses_index() {
    let app = initialized_app(healthy_state(index_with_hits(), None)).await;
    let body = json!({"seed_vector": [1.0, 0.0], "limit": 2, "min_similarity": 0.6});

    let (status, json) = post_json(app, "/api/ai/find-similar-users", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["model_used"], "primary");
    let users = json["similar_users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["id"], "alice");
    assert_eq!(users[0]["metadata"]["city"], "shanghai");
    assert_eq!(users[1]["id"], "bob");
}

#[tokio::test]
async fn test_find_similar_rejects_zero_limit() {
    let app = initialized_app(degraded_state(true)).await;
    let body = json!({"seed_vector": [1.0], "user_pool": [], "limit": 0});

    let (status, json) = post_json(app, "/api/ai/find-similar-users", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_index_vector_reports_outcome() {
    let index = index_with_hits();
    let app = initialized_app(healthy_state(index.clone(), None)).await;
    let (status, json) = post_json(
        app,
        "/api/ai/index-vector",
        json!({"id": "dave", "vector": [0.1, 0.2]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["indexed"], true);
    assert_eq!(json["collection"], "user_interests");
    assert_eq!(index.added_ids(Collection::UserInterests), vec!["dave".to_string()]);

    let app = initialized_app(degraded_state(true)).await;
    let (_, json) = post_json(
        app,
        "/api/ai/index-vector",
        json!({"id": "dave", "vector": [0.1, 0.2]}),
    )
    .await;
    assert_eq!(json["indexed"], false);
}

#[tokio::test]
async fn test_index_vector_into_named_collection() {
    let index = index_with_hits();
    let app = initialized_app(healthy_state(index.clone(), None)).await;
    let (status, json) = post_json(
        app,
        "/api/ai/index-vector",
        json!({"id": "post-9", "vector": [0.3], "collection": "content_similarity"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["indexed"], true);
    assert_eq!(json["collection"], "content_similarity");
    assert_eq!(index.added_ids(Collection::ContentSimilarity), vec!["post-9".to_string()]);
    assert!(index.added_ids(Collection::UserInterests).is_empty());
}

// ============================================================================
// Vector collections
// ============================================================================

#[tokio::test]
async fn test_add_content_vector_stores_metadata() {
    let index = index_with_hits();
    let app = initialized_app(healthy_state(index.clone(), None)).await;
    let (status, json) = post_json(
        app,
        "/api/vector/content-similarity",
        json!({"content_id": "post-1", "vector": [0.5, 0.5], "metadata": {"topic": "food"}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["collection"], "content_similarity");
    assert_eq!(json["id"], "post-1");

    let added = index.added.lock().unwrap().clone();
    assert_eq!(added.len(), 1);
    let (collection, id, metadata) = &added[0];
    assert_eq!(*collection, Collection::ContentSimilarity);
    assert_eq!(id, "post-1");
    assert_eq!(metadata["content_id"], "post-1");
    assert_eq!(metadata["topic"], "food");
    assert!(metadata["created_at"].is_string());
}

#[tokio::test]
async fn test_add_user_interest_accepts_user_id() {
    let index = index_with_hits();
    let app = initialized_app(healthy_state(index.clone(), None)).await;
    let (status, json) = post_json(
        app,
        "/api/vector/user-interests",
        json!({"user_id": "erin", "vector": [1.0, 0.0]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["collection"], "user_interests");
    assert_eq!(index.added_ids(Collection::UserInterests), vec!["erin".to_string()]);
}

#[tokio::test]
async fn test_add_cluster_vector_unavailable_when_index_failed() {
    let app = initialized_app(degraded_state(true)).await;
    let (status, json) = post_json(
        app,
        "/api/vector/cluster-compatibility",
        json!({"cluster_id": "c-1", "vector": [0.2, 0.8]}),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"]["code"], "RESOURCE_UNAVAILABLE");
}

#[tokio::test]
async fn test_add_vector_rejects_empty_vector() {
    let app = initialized_app(healthy_state(index_with_hits(), None)).await;
    let (status, json) = post_json(
        app,
        "/api/vector/content-similarity",
        json!({"content_id": "post-1", "vector": []}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_INPUT");
}

// ============================================================================
// Toxicity and spread
// ============================================================================

#[tokio::test]
async fn test_toxicity_falls_back_when_analyzer_down() {
    let app = initialized_app(degraded_state(true)).await;
    let content = format!("病毒式传播的热门内容{}", "a".repeat(90));

    let (status, json) = post_json(app, "/api/analyze/toxicity", json!({"content": content})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["model_used"], "fallback");
    // high (3) + medium (2), 100 chars
    assert_eq!(json["toxicity_score"], 5.0);
    assert_eq!(json["virulence_level"], "moderate");
    assert_eq!(json["super_spread_triggered"], false);
    assert_eq!(json["spectral_tags"], json!(["user_generated", "social_content"]));
}

#[tokio::test]
async fn test_toxicity_with_strain_persists_in_background() {
    let store = Arc::new(RecordingStore::default());
    let app = initialized_app(healthy_state(
        index_with_hits(),
        Some(store.clone() as Arc<dyn RecordStore>),
    ))
    .await;

    let (status, _) = post_json(
        app,
        "/api/analyze/toxicity",
        json!({"content": "有趣", "strain_id": "strain-1"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The update runs on a spawned task
    for _ in 0..50 {
        if !store.updates.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let updates = store.updates.lock().unwrap().clone();
    assert_eq!(updates.len(), 1);
    let (record_id, fields) = &updates[0];
    assert_eq!(record_id, "strain-1");
    assert!(fields.contains_key("toxicity_score"));
    assert_eq!(fields["virulence_level"], "low");
    assert!(fields["spectral_tags"].is_array());
}

#[tokio::test]
async fn test_spread_max_score_enterprise() {
    let app = initialized_app(degraded_state(true)).await;
    let body = json!({
        "strain_id": "s1",
        "toxicity_score": 10.0,
        "creator_level": "enterprise",
        "origin_location": {"latitude": 31.2, "longitude": 121.5}
    });

    let (status, json) = post_json(app, "/api/predict/spread", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["geo_hierarchy_progression"],
        json!(["community", "neighborhood", "street", "city"])
    );
    assert_eq!(json["confidence_score"], 1.0);
    assert_eq!(json["daoism_compliance"], true);
    assert_eq!(json["origin"]["latitude"], 31.2);
    let reach: u64 = json["predicted_path"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["estimated_users"].as_u64().unwrap())
        .sum();
    assert_eq!(json["estimated_reach"].as_u64().unwrap(), reach);
}

#[tokio::test]
async fn test_spread_zero_score_free_is_empty() {
    let app = initialized_app(degraded_state(true)).await;
    let body = json!({"toxicity_score": 0.0, "creator_level": "free"});

    let (status, json) = post_json(app, "/api/predict/spread", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["predicted_path"], json!([]));
    assert_eq!(json["estimated_reach"], 0);
}

#[tokio::test]
async fn test_spread_unknown_tier_is_bad_request() {
    let app = initialized_app(degraded_state(true)).await;
    let body = json!({"toxicity_score": 5.0, "creator_level": "platinum"});

    let (status, json) = post_json(app, "/api/predict/spread", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_spread_out_of_range_score_is_bad_request() {
    let app = initialized_app(degraded_state(true)).await;
    let body = json!({"toxicity_score": 11.0, "creator_level": "premium"});

    let (status, _) = post_json(app, "/api/predict/spread", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Content insights
// ============================================================================

#[tokio::test]
async fn test_analyze_content() {
    let app = initialized_app(degraded_state(true)).await;
    let (status, json) = post_json(
        app,
        "/api/ai/analyze-content",
        json!({"content": "今天 去 旅行 很开心"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["sentiment"], "positive");
    assert_eq!(json["topics"], json!(["life", "travel"]));
    assert_eq!(json["keywords"], json!(["今天", "旅行", "很开心"]));
    assert_eq!(json["model_used"], "fallback");
}

#[tokio::test]
async fn test_extract_tags() {
    let app = initialized_app(degraded_state(true)).await;
    let (status, json) = post_json(
        app,
        "/api/ai/extract-tags",
        json!({"content": "美食 餐厅 推荐"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["tags"], json!(["food", "美食", "餐厅", "推荐"]));
}

#[tokio::test]
async fn test_predict_potential() {
    let app = initialized_app(degraded_state(true)).await;
    let (status, json) = post_json(
        app,
        "/api/ai/predict-potential",
        json!({"star_seed": {"content": ""}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!((json["potential_score"].as_f64().unwrap() - 60.0).abs() < 1e-9);
    assert_eq!(json["model_used"], "fallback");
}

#[tokio::test]
async fn test_optimize_propagation() {
    let app = initialized_app(degraded_state(true)).await;
    let targets: Vec<_> = (0..12).map(|i| json!({"id": format!("u{}", i)})).collect();
    let (status, json) = post_json(
        app,
        "/api/ai/optimize-propagation",
        json!({"star_seed": {"id": "seed-1"}, "target_users": targets}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["model_used"], "fallback");
    let path = &json["optimal_path"];
    assert_eq!(path["seed_id"], "seed-1");
    assert_eq!(path["estimated_reach"], 12);
    assert_eq!(path["first_targets"].as_array().unwrap().len(), 5);

    let sequence = path["propagation_sequence"].as_array().unwrap();
    assert_eq!(sequence.len(), 10);
    assert_eq!(sequence[0]["user_id"], "u0");
    assert_eq!(sequence[0]["expected_resonance"], 80);
    assert_eq!(sequence[9]["expected_resonance"], 35);
    assert!(sequence[0]["timestamp"].is_string());
}
