//! HTTP API tests: the router driven with `oneshot` over a temp database,
//! a keyword embedder, and a scripted completion client.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use clause_harness::app::AppContext;
use clause_harness::completion::CompletionClient;
use clause_harness::config::Config;
use clause_harness::server::build_router;
use clause_harness::store::SqliteStore;
use clause_harness::{db, library, migrate};
use clause_harness_core::embedding::Embedder;
use clause_harness_core::models::ProposedEdit;
use clause_harness_core::proposal::EditProposer;
use clause_harness_core::Result;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const LEASE: &str = "1. Term. The lease runs for one year.\n\n2. Confidentiality. The Tenant shall keep the access codes confidential.\n\n3. Governing Law. This lease is governed by the laws of the State of Ohio.";

/// Three dimensions: confidentiality, termination, governing law.
struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keywords"
    }

    fn dims(&self) -> usize {
        3
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let t = t.to_lowercase();
                let hit = |w: &str| if t.contains(w) { 1.0 } else { 0.05 };
                vec![hit("confidential"), hit("terminat"), hit("law")]
            })
            .collect())
    }
}

/// Returns a fixed edit list and echoes prompts back.
struct ScriptedCompletion {
    edits: Vec<ProposedEdit>,
}

#[async_trait]
impl EditProposer for ScriptedCompletion {
    async fn propose(&self, _instruction: &str, _document_text: &str) -> Result<Vec<ProposedEdit>> {
        Ok(self.edits.clone())
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn generate_clause(&self, instruction: &str, examples: &str) -> Result<String> {
        Ok(format!("DRAFT {} | {}", instruction, examples))
    }

    async fn rewrite_clause(&self, text: &str) -> Result<String> {
        Ok(format!("REWRITTEN {}", text))
    }

    async fn summarize_clause(&self, text: &str) -> Result<String> {
        Ok(format!("SUMMARY {}", text))
    }

    fn as_proposer(&self) -> &dyn EditProposer {
        self
    }
}

async fn test_context(edits: Vec<ProposedEdit>) -> (TempDir, AppContext) {
    let tmp = TempDir::new().unwrap();
    let config = Config::from_toml(&format!(
        "[db]\npath = \"{}/clauses.sqlite\"\n\n[retrieval]\ndefault_k = 3\n",
        tmp.path().display()
    ))
    .unwrap();

    let pool = db::connect(&config).await.unwrap();
    migrate::migrate_pool(&pool).await.unwrap();
    let store = SqliteStore::new(pool, 3);

    let ctx = AppContext::new(
        config,
        store,
        Arc::new(KeywordEmbedder),
        Arc::new(ScriptedCompletion { edits }),
    );
    (tmp, ctx)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn upload_lease(app: &Router) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/upload",
        Some(json!({ "name": "Lease", "fullText": LEASE })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "upload failed: {}", body);
    assert_eq!(body["spanCount"], 3);
    assert_eq!(body["embedded"], true);
    body["documentId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (_tmp, ctx) = test_context(vec![]).await;
    let app = build_router(ctx);

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_upload_then_get_and_list() {
    let (_tmp, ctx) = test_context(vec![]).await;
    let app = build_router(ctx);
    let id = upload_lease(&app).await;

    let (status, body) = send(&app, "GET", &format!("/api/templates/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fullText"], LEASE);
    let spans = body["spans"].as_array().unwrap();
    assert_eq!(spans.len(), 3);
    for span in spans {
        let start = span["startIndex"].as_u64().unwrap() as usize;
        let end = span["endIndex"].as_u64().unwrap() as usize;
        assert_eq!(&LEASE[start..end], span["text"].as_str().unwrap());
    }

    let (status, body) = send(&app, "GET", "/api/templates", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], id.as_str());
}

#[tokio::test]
async fn test_upload_blank_text_is_bad_request() {
    let (_tmp, ctx) = test_context(vec![]).await;
    let app = build_router(ctx);

    let (status, body) = send(
        &app,
        "POST",
        "/api/upload",
        Some(json!({ "name": "Empty", "fullText": "   \n" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_missing_template_is_not_found() {
    let (_tmp, ctx) = test_context(vec![]).await;
    let app = build_router(ctx);

    let (status, body) = send(&app, "GET", "/api/templates/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_patch_inline_text_reports_verified_and_rejected() {
    let edits = vec![
        ProposedEdit::new("one year", "two years"),
        ProposedEdit::new("ninety days", "sixty days"),
    ];
    let (_tmp, ctx) = test_context(edits).await;
    let app = build_router(ctx);

    let (status, body) = send(
        &app,
        "POST",
        "/api/patch",
        Some(json!({ "instruction": "make the term two years", "fullText": LEASE })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "verified");

    let edits = body["edits"].as_array().unwrap();
    assert_eq!(edits.len(), 1);
    let start = edits[0]["startIndex"].as_u64().unwrap() as usize;
    let end = edits[0]["endIndex"].as_u64().unwrap() as usize;
    assert_eq!(&LEASE[start..end], "one year");
    assert_eq!(edits[0]["originalTextSnippet"], "one year");

    assert_eq!(body["rejections"].as_array().unwrap().len(), 1);
    assert_eq!(body["rejections"][0]["editIndex"], 1);
    assert_eq!(body["previews"][0]["currentText"], "one year");
}

#[tokio::test]
async fn test_patch_blank_instruction_is_bad_request() {
    let (_tmp, ctx) = test_context(vec![]).await;
    let app = build_router(ctx);

    let (status, _) = send(
        &app,
        "POST",
        "/api/patch",
        Some(json!({ "instruction": " ", "fullText": LEASE })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patch_requires_exactly_one_target() {
    let (_tmp, ctx) = test_context(vec![]).await;
    let app = build_router(ctx);

    let (status, body) = send(
        &app,
        "POST",
        "/api/patch",
        Some(json!({ "instruction": "anything" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, _) = send(
        &app,
        "POST",
        "/api/patch",
        Some(json!({ "instruction": "anything", "fullText": LEASE, "templateId": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_no_edits_proposed() {
    let (_tmp, ctx) = test_context(vec![]).await;
    let app = build_router(ctx);

    let (status, body) = send(
        &app,
        "POST",
        "/api/patch",
        Some(json!({ "instruction": "do nothing", "fullText": LEASE })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "no_edits_proposed");
    assert!(body["edits"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_patch_and_apply_stored_document() {
    let (_tmp, ctx) = test_context(vec![ProposedEdit::new("State of Ohio", "State of New York")]).await;
    let app = build_router(ctx);
    let id = upload_lease(&app).await;

    let (status, proposal) = send(
        &app,
        "POST",
        "/api/patch",
        Some(json!({ "instruction": "use New York law", "templateId": id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", proposal);
    assert_eq!(proposal["status"], "verified");

    let (status, applied) = send(
        &app,
        "POST",
        "/api/apply",
        Some(json!({ "templateId": id, "edits": proposal["edits"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", applied);
    assert_eq!(applied["appliedCount"], 1);
    assert_eq!(applied["spanCount"], 3);
    assert!(applied["errors"].as_array().unwrap().is_empty());

    let (_, doc) = send(&app, "GET", &format!("/api/templates/{}", id), None).await;
    let text = doc["fullText"].as_str().unwrap();
    assert!(text.ends_with("laws of the State of New York."));
    assert!(doc["spans"][2]["text"]
        .as_str()
        .unwrap()
        .contains("State of New York"));

    // The same edits are now stale.
    let (status, again) = send(
        &app,
        "POST",
        "/api/apply",
        Some(json!({ "templateId": id, "edits": proposal["edits"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["appliedCount"], 0);
    assert_eq!(again["errors"].as_array().unwrap().len(), 1);
    assert!(again["spanCount"].is_null());

    let (status, strict) = send(
        &app,
        "POST",
        "/api/apply",
        Some(json!({ "templateId": id, "edits": proposal["edits"], "strict": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", strict);
    assert_eq!(strict["error"]["code"], "conflict");
}

#[tokio::test]
async fn test_strict_apply_leaves_inline_text_untouched() {
    let (_tmp, ctx) = test_context(vec![]).await;
    let app = build_router(ctx);

    let edits = json!([
        { "startIndex": 0, "endIndex": 5, "newText": "ALPHA", "originalTextSnippet": "alpha" },
        { "startIndex": 6, "endIndex": 10, "newText": "B", "originalTextSnippet": "zzzz" },
    ]);
    let (status, body) = send(
        &app,
        "POST",
        "/api/apply",
        Some(json!({ "fullText": "alpha beta", "edits": edits, "strict": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("no longer match"));
}

#[tokio::test]
async fn test_apply_inline_text_descending_order() {
    let (_tmp, ctx) = test_context(vec![]).await;
    let app = build_router(ctx);

    let text = "alpha beta gamma";
    let edits = json!([
        { "startIndex": 0, "endIndex": 5, "newText": "ALPHA!", "originalTextSnippet": "alpha" },
        { "startIndex": 11, "endIndex": 16, "newText": "G", "originalTextSnippet": "gamma" },
    ]);
    let (status, body) = send(
        &app,
        "POST",
        "/api/apply",
        Some(json!({ "fullText": text, "edits": edits })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["text"], "ALPHA! beta G");
    assert_eq!(body["appliedCount"], 2);
}

#[tokio::test]
async fn test_update_and_delete_template() {
    let (_tmp, ctx) = test_context(vec![]).await;
    let app = build_router(ctx);
    let id = upload_lease(&app).await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/templates/{}", id),
        Some(json!({ "fullText": "A single clause now." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["templateId"], id.as_str());
    assert_eq!(body["spanCount"], 1);

    let (status, _) = send(&app, "DELETE", &format!("/api/templates/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &format!("/api/templates/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", &format!("/api/templates/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_missing_template_is_not_found() {
    let (_tmp, ctx) = test_context(vec![]).await;
    let app = build_router(ctx);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/templates/missing",
        Some(json!({ "fullText": "Anything." })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_filters_and_ranking() {
    let (_tmp, ctx) = test_context(vec![]).await;
    library::load_items(&ctx, library::builtin_items())
        .await
        .unwrap();
    let app = build_router(ctx);
    let id = upload_lease(&app).await;

    let (status, body) = send(
        &app,
        "GET",
        "/api/search?query=confidential%20information&k=2&reference=only",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let hits = body.as_array().unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0]["id"], "library-1");
    assert_eq!(hits[0]["isReference"], true);

    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/search?query=confidential&templateId={}", id),
        None,
    )
    .await;
    let hits = body.as_array().unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|h| h["documentId"] == id.as_str()));
    assert!(hits[0]["text"].as_str().unwrap().contains("Confidentiality"));

    let (_, body) = send(&app, "GET", "/api/search?query=", None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_library_load_keeps_builtin_clauses() {
    let (_tmp, ctx) = test_context(vec![]).await;
    let app = build_router(ctx.clone());

    let (status, body) = send(&app, "POST", "/api/library/load", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["loaded"], 3);
    assert_eq!(body["referenceClauses"], 3);

    let (status, body) = send(
        &app,
        "POST",
        "/api/library/load",
        Some(json!({ "items": [{ "text": "My custom indemnity clause." }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["loaded"], 1);
    assert_eq!(body["referenceClauses"], 4);
    assert_eq!(ctx.store.count_vectors(true).await.unwrap(), 4);

    let (_, hits) = send(
        &app,
        "GET",
        "/api/search?query=confidential&k=1&reference=only",
        None,
    )
    .await;
    assert_eq!(hits[0]["id"], "library-1");
    assert!(hits[0]["text"]
        .as_str()
        .unwrap()
        .contains("confidential information"));

    let (status, body) = send(
        &app,
        "POST",
        "/api/library/load",
        Some(json!({ "items": [{ "text": "   " }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_generate_uses_reference_examples() {
    let (_tmp, ctx) = test_context(vec![]).await;
    library::load_items(&ctx, library::builtin_items())
        .await
        .unwrap();
    let app = build_router(ctx);

    let (status, body) = send(
        &app,
        "POST",
        "/api/clauses/generate",
        Some(json!({ "instruction": "a governing law clause" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let draft = body["generatedClause"].as_str().unwrap();
    assert!(draft.contains("Example 1:\nThis Agreement shall be governed by the laws of the State of New York."));
    assert_eq!(body["examples"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_generate_without_examples_falls_back() {
    let (_tmp, ctx) = test_context(vec![]).await;
    let app = build_router(ctx);

    let (status, body) = send(
        &app,
        "POST",
        "/api/clauses/generate",
        Some(json!({ "instruction": "an indemnity clause" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["generatedClause"]
        .as_str()
        .unwrap()
        .ends_with("No relevant reference examples found."));
}

#[tokio::test]
async fn test_rewrite_and_summarize() {
    let (_tmp, ctx) = test_context(vec![]).await;
    let app = build_router(ctx);

    let (status, body) = send(
        &app,
        "POST",
        "/api/clauses/rewrite",
        Some(json!({ "text": "tenant pays rent" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "REWRITTEN tenant pays rent");

    let (status, body) = send(
        &app,
        "POST",
        "/api/clauses/summarize",
        Some(json!({ "text": "tenant pays rent" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "SUMMARY tenant pays rent");

    let (status, _) = send(&app, "POST", "/api/clauses/rewrite", Some(json!({ "text": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (_tmp, ctx) = test_context(vec![]).await;
    let app = build_router(ctx);

    let (status, body) = send(&app, "POST", "/api/patch", Some(json!({ "fullText": 5 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}
