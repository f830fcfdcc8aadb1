//! # Integration Tests for dealroom-api
//!
//! Drives whole negotiations over HTTP: creation, invitation, selections,
//! rounds, counter-proposals, signing and the audit trail. Also covers the
//! error mapping, optimistic concurrency and authentication.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use dealroom_api::config::AppConfig;
use dealroom_api::state::AppState;

/// Helper: build the test app with auth disabled.
fn test_app() -> axum::Router {
    dealroom_api::app(AppState::new())
}

/// Helper: build the test app with auth enabled.
fn test_app_with_auth(token: &str) -> axum::Router {
    let config = AppConfig {
        auth_token: Some(token.to_string()),
        ..AppConfig::default()
    };
    dealroom_api::app(AppState::with_config(config, None).unwrap())
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Helper: send a request as `user` (auth disabled) and parse the JSON body.
async fn call(
    app: &axum::Router,
    method: &str,
    uri: &str,
    user: Uuid,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", user.to_string());
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let text = body_string(response).await;
    let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
    (status, value)
}

struct Negotiation {
    app: axum::Router,
    deal: String,
    a: Uuid,
    b: Uuid,
}

impl Negotiation {
    /// An NDA with both parties linked, no selections yet.
    async fn joined() -> Self {
        let app = test_app();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (status, created) = call(
            &app,
            "POST",
            "/v1/deals",
            a,
            Some(json!({
                "contract_type": "mutual-nda",
                "title": "Acme / Globex NDA",
                "initiator_name": "Acme Corp"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let deal = created["deal"]["id"].as_str().unwrap().to_string();

        let (status, invitation) = call(
            &app,
            "POST",
            &format!("/v1/deals/{deal}/invite"),
            a,
            Some(json!({ "name": "Globex Ltd", "email": "legal@globex.example" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(invitation["deal_status"], "AWAITING_RESPONSE");
        let code = invitation["invitation_code"].as_str().unwrap().to_string();

        let (status, _) = call(
            &app,
            "POST",
            &format!("/v1/deals/{deal}/accept-invitation"),
            b,
            Some(json!({ "code": code })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        Self { app, deal, a, b }
    }

    async fn view(&self) -> Value {
        let (status, view) = call(&self.app, "GET", &format!("/v1/deals/{}", self.deal), self.a, None).await;
        assert_eq!(status, StatusCode::OK);
        view
    }

    /// Clause id for a clause key.
    async fn clause_id(&self, key: &str) -> String {
        let view = self.view().await;
        view["clauses"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["clause"]["key"] == key)
            .map(|c| c["clause"]["id"].as_str().unwrap().to_string())
            .unwrap()
    }

    async fn select_all(&self, user: Uuid, picks: &[(&str, &str, i64, i64)]) {
        let mut selections = Vec::new();
        for (key, option, priority, flexibility) in picks {
            selections.push(json!({
                "clause_id": self.clause_id(key).await,
                "option_id": option,
                "priority": priority,
                "flexibility": flexibility,
            }));
        }
        let (status, body) = call(
            &self.app,
            "PUT",
            &format!("/v1/deals/{}/selections/bulk", self.deal),
            user,
            Some(json!({ "selections": selections })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["saved"], picks.len());
    }

    async fn submit(&self, user: Uuid) -> Value {
        let (status, body) = call(
            &self.app,
            "POST",
            &format!("/v1/deals/{}/selections/submit", self.deal),
            user,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body
    }

    /// Both parties submitted; remedies is a same-choice clause.
    async fn submitted() -> Self {
        let n = Self::joined().await;
        n.select_all(
            n.a,
            &[
                ("confidentiality-term", "five-years", 4, 2),
                ("permitted-disclosure", "employees-only", 3, 3),
                ("non-solicitation", "twelve-months", 2, 4),
                ("remedies", "damages-only", 3, 3),
            ],
        )
        .await;
        n.select_all(
            n.b,
            &[
                ("confidentiality-term", "one-year", 4, 2),
                ("permitted-disclosure", "group-companies", 3, 3),
                ("non-solicitation", "none", 4, 1),
                ("remedies", "damages-only", 2, 5),
            ],
        )
        .await;
        assert_eq!(n.submit(n.a).await["both_submitted"], false);
        assert_eq!(n.submit(n.b).await["both_submitted"], true);
        n
    }

    async fn generate(&self) -> Value {
        let (status, body) = call(
            &self.app,
            "POST",
            &format!("/v1/deals/{}/rounds", self.deal),
            self.a,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    async fn respond(&self, user: Uuid, clause_id: &str, accept: bool, round: u64) -> (StatusCode, Value) {
        call(
            &self.app,
            "POST",
            &format!("/v1/deals/{}/clauses/{clause_id}/respond", self.deal),
            user,
            Some(json!({ "accept": accept, "round_number": round })),
        )
        .await
    }
}

/// Open clause ids from a round response.
fn open_clause_ids(round: &Value) -> Vec<String> {
    let agreed: Vec<&Value> = round["agreed_clause_ids"].as_array().unwrap().iter().collect();
    round["suggestions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| &s["clause_id"])
        .filter(|id| !agreed.contains(id))
        .map(|id| id.as_str().unwrap().to_string())
        .collect()
}

// -- Health & Docs ------------------------------------------------------------

#[tokio::test]
async fn test_health_probes() {
    let app = test_app();
    for (uri, expected) in [("/health/liveness", "ok"), ("/health/readiness", "ready")] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, expected);
    }
}

#[tokio::test]
async fn test_metrics_without_recorder_is_not_found() {
    let response = test_app()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let (status, spec) = call(&test_app(), "GET", "/openapi.json", Uuid::new_v4(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(spec["paths"]["/v1/deals/{id}/rounds"].is_object());
}

// -- Catalog ------------------------------------------------------------------

#[tokio::test]
async fn test_catalog_lists_builtin_templates() {
    let app = test_app();
    let user = Uuid::new_v4();
    let (status, list) = call(&app, "GET", "/v1/catalog/templates", user, None).await;
    assert_eq!(status, StatusCode::OK);
    let types: Vec<&str> = list["templates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["contract_type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["mutual-nda", "service-agreement"]);

    let (status, nda) = call(&app, "GET", "/v1/catalog/templates/mutual-nda", user, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(nda["template"]["clauses"].as_array().unwrap().len(), 4);

    let (status, err) = call(&app, "GET", "/v1/catalog/templates/lease", user, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["error"]["code"], "NOT_FOUND");
}

// -- Deal creation ------------------------------------------------------------

#[tokio::test]
async fn test_create_deal_starts_in_draft() {
    let app = test_app();
    let (status, body) = call(
        &app,
        "POST",
        "/v1/deals",
        Uuid::new_v4(),
        Some(json!({
            "contract_type": "mutual-nda",
            "title": "NDA",
            "initiator_name": "Acme"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["deal"]["status"], "DRAFT");
    assert_eq!(body["deal"]["governing_law"], "New York");
    assert_eq!(body["total_clauses"], 4);
    assert_eq!(body["version"], 0);
    assert_eq!(body["parties"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_deal_validation() {
    let app = test_app();
    let user = Uuid::new_v4();
    let (status, _) = call(
        &app,
        "POST",
        "/v1/deals",
        user,
        Some(json!({ "contract_type": "mutual-nda", "title": " ", "initiator_name": "Acme" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(&app, "POST", "/v1/deals", user, Some(json!({ "title": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "POST",
        "/v1/deals",
        user,
        Some(json!({ "contract_type": "lease", "title": "x", "initiator_name": "Acme" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unentitled_contract_type_is_forbidden() {
    let config = AppConfig {
        entitled_contract_types: Some(vec!["service-agreement".into()]),
        ..AppConfig::default()
    };
    let app = dealroom_api::app(AppState::with_config(config, None).unwrap());
    let user = Uuid::new_v4();
    let (status, _) = call(
        &app,
        "POST",
        "/v1/deals",
        user,
        Some(json!({ "contract_type": "mutual-nda", "title": "NDA", "initiator_name": "Acme" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, list) = call(&app, "GET", "/v1/deals", user, None).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_wrong_invitation_code_is_rejected() {
    let app = test_app();
    let a = Uuid::new_v4();
    let (_, created) = call(
        &app,
        "POST",
        "/v1/deals",
        a,
        Some(json!({ "contract_type": "mutual-nda", "title": "NDA", "initiator_name": "Acme" })),
    )
    .await;
    let deal = created["deal"]["id"].as_str().unwrap();
    call(
        &app,
        "POST",
        &format!("/v1/deals/{deal}/invite"),
        a,
        Some(json!({ "name": "Globex" })),
    )
    .await;
    let (status, _) = call(
        &app,
        "POST",
        &format!("/v1/deals/{deal}/accept-invitation"),
        Uuid::new_v4(),
        Some(json!({ "code": "not-the-code" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// -- Selections ---------------------------------------------------------------

#[tokio::test]
async fn test_selection_rules() {
    let n = Negotiation::joined().await;
    let clause = n.clause_id("remedies").await;
    let uri = format!("/v1/deals/{}/selections", n.deal);

    let (status, _) = call(
        &n.app,
        "PUT",
        &uri,
        n.a,
        Some(json!({ "clause_id": clause, "option_id": "damages-only", "priority": 9, "flexibility": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(
        &n.app,
        "PUT",
        &uri,
        n.a,
        Some(json!({ "clause_id": clause, "option_id": "five-years", "priority": 3, "flexibility": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, saved) = call(
        &n.app,
        "PUT",
        &uri,
        n.a,
        Some(json!({ "clause_id": clause, "option_id": "damages-only", "priority": 3, "flexibility": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["selection"]["option_id"], "damages-only");

    let (status, err) = call(
        &n.app,
        "POST",
        &format!("/v1/deals/{}/selections/submit", n.deal),
        n.a,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("missing selections for 3 clause(s)"));

    let (status, mine) = call(&n.app, "GET", &uri, n.a, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["role"], "INITIATOR");
    assert_eq!(mine["selections"].as_array().unwrap().len(), 1);
    let (_, theirs) = call(&n.app, "GET", &uri, n.b, None).await;
    assert!(theirs["selections"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_bulk_save_is_all_or_nothing() {
    let n = Negotiation::joined().await;
    let term = n.clause_id("confidentiality-term").await;
    let remedies = n.clause_id("remedies").await;
    let (status, _) = call(
        &n.app,
        "PUT",
        &format!("/v1/deals/{}/selections/bulk", n.deal),
        n.a,
        Some(json!({ "selections": [
            { "clause_id": term, "option_id": "one-year", "priority": 3, "flexibility": 3 },
            { "clause_id": remedies, "option_id": "one-year", "priority": 3, "flexibility": 3 },
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, mine) = call(&n.app, "GET", &format!("/v1/deals/{}/selections", n.deal), n.a, None).await;
    assert!(mine["selections"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_submitted_party_cannot_change_selections() {
    let n = Negotiation::submitted().await;
    let clause = n.clause_id("remedies").await;
    let (status, err) = call(
        &n.app,
        "PUT",
        &format!("/v1/deals/{}/selections", n.deal),
        n.a,
        Some(json!({ "clause_id": clause, "option_id": "injunctive-relief", "priority": 3, "flexibility": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"]["message"], "you have already submitted your selections");
}

// -- Rounds -------------------------------------------------------------------

#[tokio::test]
async fn test_generate_requires_both_submissions() {
    let n = Negotiation::joined().await;
    let (status, err) = call(
        &n.app,
        "POST",
        &format!("/v1/deals/{}/rounds", n.deal),
        n.a,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        err["error"]["message"],
        "both parties must submit their selections before a compromise can be generated"
    );
}

#[tokio::test]
async fn test_full_negotiation_to_completion() {
    let n = Negotiation::submitted().await;
    let round = n.generate().await;
    assert_eq!(round["round_number"], 1);
    assert_eq!(round["suggestion_count"], 4);
    assert_eq!(round["agreed_clause_ids"].as_array().unwrap().len(), 1);
    assert_eq!(round["deal_status"], "NEGOTIATING");

    for s in round["suggestions"].as_array().unwrap() {
        for key in ["satisfaction_a", "satisfaction_b"] {
            let score = s[key].as_u64().unwrap();
            assert!(score <= 100);
        }
    }

    let open = open_clause_ids(&round);
    assert_eq!(open.len(), 3);
    let mut last = Value::Null;
    for clause in &open {
        let (status, first) = n.respond(n.a, clause, true, 1).await;
        assert_eq!(status, StatusCode::OK, "{first}");
        assert_eq!(first["clause_status"], "SUGGESTED");
        let (status, second) = n.respond(n.b, clause, true, 1).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["clause_status"], "AGREED");
        last = second;
    }
    assert_eq!(last["deal_status"], "AGREED");

    let (_, progress) = call(&n.app, "GET", &format!("/v1/deals/{}/progress", n.deal), n.b, None).await;
    assert_eq!(progress["summary"]["agreed"], 4);
    assert_eq!(progress["percent_agreed"], 100.0);

    let (status, signing) = call(&n.app, "POST", &format!("/v1/deals/{}/signing", n.deal), n.b, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(signing["deal"]["status"], "SIGNING");

    let sign_uri = format!("/v1/deals/{}/signatures", n.deal);
    let (_, first) = call(&n.app, "POST", &sign_uri, n.a, None).await;
    assert_eq!(first["completed"], false);
    let (status, _) = call(&n.app, "POST", &sign_uri, n.a, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, second) = call(&n.app, "POST", &sign_uri, n.b, None).await;
    assert_eq!(second["completed"], true);
    assert_eq!(second["deal_status"], "COMPLETED");

    let (status, trail) = call(&n.app, "GET", &format!("/v1/deals/{}/audit", n.deal), n.a, None).await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = trail
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions.first(), Some(&"DEAL_ROOM_CREATED"));
    assert!(actions.contains(&"COMPROMISE_GENERATED"));
    assert!(actions.contains(&"DEAL_AGREED"));
    assert_eq!(actions.last(), Some(&"DEAL_COMPLETED"));

    let (status, integrity) = call(&n.app, "GET", "/v1/audit/verify", n.a, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(integrity["chain_valid"], true);
    assert_eq!(integrity["total_entries"], trail.as_array().unwrap().len());
}

#[tokio::test]
async fn test_signing_requires_agreement() {
    let n = Negotiation::submitted().await;
    n.generate().await;
    let (status, err) = call(&n.app, "POST", &format!("/v1/deals/{}/signing", n.deal), n.a, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"]["message"], "signing requires every clause to be agreed");
}

#[tokio::test]
async fn test_stale_round_and_version_conflict() {
    let n = Negotiation::submitted().await;
    let round = n.generate().await;
    let clause = open_clause_ids(&round).remove(0);

    let (status, _) = n.respond(n.a, &clause, true, 7).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let version = round["version"].as_u64().unwrap();
    let (status, _) = call(
        &n.app,
        "POST",
        &format!("/v1/deals/{}/rounds/regenerate?expected_version={}", n.deal, version - 1),
        n.a,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, regenerated) = call(
        &n.app,
        "POST",
        &format!("/v1/deals/{}/rounds/regenerate?expected_version={version}", n.deal),
        n.a,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(regenerated["round_number"], 2);

    let (status, err) = n.respond(n.b, &clause, true, 1).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"]["code"], "CONFLICT");

    let (_, history) = call(&n.app, "GET", &format!("/v1/deals/{}/history", n.deal), n.a, None).await;
    let numbers: Vec<u64> = history["rounds"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["round"]["round_number"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, vec![1, 2]);
}

// -- Counter-proposals --------------------------------------------------------

#[tokio::test]
async fn test_counter_proposal_accepted_agrees_clause() {
    let n = Negotiation::submitted().await;
    let round = n.generate().await;
    let clause = n.clause_id("confidentiality-term").await;
    let suggested = round["suggestions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["clause_id"] == clause.as_str())
        .map(|s| s["suggested_option_id"].as_str().unwrap().to_string())
        .unwrap();
    let alternative = ["one-year", "two-years", "three-years", "five-years"]
        .into_iter()
        .find(|o| *o != suggested)
        .unwrap();

    let uri = format!("/v1/deals/{}/clauses/{clause}/counter-proposals", n.deal);
    let (status, err) = call(
        &n.app,
        "POST",
        &uri,
        n.b,
        Some(json!({ "option_id": suggested, "round_number": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"]["message"], "a counter-proposal must differ from the current suggestion");

    let (status, filed) = call(
        &n.app,
        "POST",
        &uri,
        n.b,
        Some(json!({ "option_id": alternative, "rationale": "shorter is standard", "round_number": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{filed}");
    assert_eq!(filed["proposal"]["status"], "PENDING");
    let proposal = filed["proposal"]["id"].as_str().unwrap().to_string();
    let respond_uri = format!("/v1/deals/{}/counter-proposals/{proposal}/respond", n.deal);

    let (status, err) = call(&n.app, "POST", &respond_uri, n.b, Some(json!({ "accept": true }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"]["message"], "you cannot respond to your own counter-proposal");

    let (status, decision) = call(&n.app, "POST", &respond_uri, n.a, Some(json!({ "accept": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decision["accepted"], true);
    assert_eq!(decision["all_agreed"], false);

    let view = n.view().await;
    let term = view["clauses"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["clause"]["id"] == clause.as_str())
        .unwrap();
    assert_eq!(term["clause"]["status"], "AGREED");
    assert_eq!(term["clause"]["agreed_option_id"], alternative);

    let (_, listed) = call(&n.app, "GET", &format!("/v1/deals/{}/counter-proposals", n.deal), n.a, None).await;
    assert_eq!(listed["proposals"][0]["status"], "ACCEPTED");

    let (status, _) = call(&n.app, "POST", &respond_uri, n.a, Some(json!({ "accept": false }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let n = Negotiation::submitted().await;
    n.generate().await;
    let (status, _) = n.respond(n.a, &Uuid::new_v4().to_string(), true, 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&n.app, "GET", &format!("/v1/deals/{}", Uuid::new_v4()), n.a, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &n.app,
        "POST",
        &format!("/v1/deals/{}/counter-proposals/{}/respond", n.deal, Uuid::new_v4()),
        n.b,
        Some(json!({ "accept": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancelled_deal_rejects_further_work() {
    let n = Negotiation::submitted().await;
    let (status, body) = call(
        &n.app,
        "POST",
        &format!("/v1/deals/{}/cancel", n.deal),
        n.b,
        Some(json!({ "reason": "terms moved elsewhere" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deal"]["status"], "CANCELLED");
    assert_eq!(body["deal"]["cancel_reason"], "terms moved elsewhere");

    let (status, _) = call(&n.app, "POST", &format!("/v1/deals/{}/rounds", n.deal), n.a, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// -- Authentication -----------------------------------------------------------

#[tokio::test]
async fn test_auth_rejects_missing_token() {
    let app = test_app_with_auth("s3cret");
    let response = app
        .oneshot(Request::builder().uri("/v1/deals").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_is_outside_auth() {
    let app = test_app_with_auth("s3cret");
    let response = app
        .oneshot(Request::builder().uri("/health/liveness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_parties_only_see_their_own_deals() {
    let app = test_app_with_auth("s3cret");
    let owner = Uuid::new_v4();
    let outsider = Uuid::new_v4();
    let send = |user: Option<Uuid>, role: &str, method: &str, uri: String, body: Option<Value>| {
        let token = format!(
            "Bearer {role}:{}:s3cret",
            user.map(|u| u.to_string()).unwrap_or_default()
        );
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", token);
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    };

    let response = app
        .clone()
        .oneshot(send(
            Some(owner),
            "party",
            "POST",
            "/v1/deals".into(),
            Some(json!({ "contract_type": "mutual-nda", "title": "NDA", "initiator_name": "Acme" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = serde_json::from_str(&body_string(response).await).unwrap();
    let deal = created["deal"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(send(Some(outsider), "party", "GET", format!("/v1/deals/{deal}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(send(Some(owner), "party", "GET", "/v1/audit/verify".into(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(send(None, "operator", "GET", format!("/v1/deals/{deal}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(send(None, "operator", "GET", "/v1/audit/verify".into(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
