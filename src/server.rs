//! HTTP API server.
//!
//! Exposes the document, patch, search, and clause-drafting workflows as a
//! JSON API for the contract editor front end.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `POST`   | `/api/upload` | Split, embed, and store a document |
//! | `GET`    | `/api/templates` | List documents (`?includeReference=true`) |
//! | `GET`    | `/api/templates/{id}` | Document with its spans |
//! | `PUT`    | `/api/templates/{id}` | Replace the full text |
//! | `DELETE` | `/api/templates/{id}` | Delete a document |
//! | `POST`   | `/api/patch` | Propose and verify edits |
//! | `POST`   | `/api/apply` | Apply verified edits |
//! | `GET`    | `/api/search` | Similarity search over clauses |
//! | `POST`   | `/api/library/load` | Index library clauses (built-in set when `items` is absent) |
//! | `POST`   | `/api/clauses/generate` | Draft a clause from reference examples |
//! | `POST`   | `/api/clauses/rewrite` | Rewrite a clause |
//! | `POST`   | `/api/clauses/summarize` | Summarize a clause |
//!
//! Errors use the body described in [`crate::error`].
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the editor can run on
//! a different origin during development.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clause_harness_core::index::{ReferenceFilter, SearchFilters};
use clause_harness_core::ClauseError;
use clause_harness_core::models::{SearchHit, VerifiedEdit};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::app::AppContext;
use crate::error::ApiError;
use crate::generate::{self, GeneratedClause};
use crate::get::{self as documents, DocumentResponse, DocumentSummary};
use crate::ingest::{self, IngestSummary};
use crate::library::{self, LibraryFileEntry};
use crate::patch::{self, PatchResponse};
use crate::search;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Build the router with all routes, CORS, and request tracing.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/upload", post(handle_upload))
        .route("/api/templates", get(handle_list_templates))
        .route(
            "/api/templates/{id}",
            get(handle_get_template)
                .put(handle_update_template)
                .delete(handle_delete_template),
        )
        .route("/api/patch", post(handle_patch))
        .route("/api/apply", post(handle_apply))
        .route("/api/search", get(handle_search))
        .route("/api/library/load", post(handle_library_load))
        .route("/api/clauses/generate", post(handle_generate))
        .route("/api/clauses/rewrite", post(handle_rewrite))
        .route("/api/clauses/summarize", post(handle_summarize))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx)
}

/// Start the server on `[server].bind` and run until the process exits.
pub async fn run_server(ctx: AppContext) -> anyhow::Result<()> {
    let bind_addr = ctx.config.server.bind.clone();
    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "server listening");
    println!("Clause server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Documents ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadRequest {
    name: String,
    full_text: String,
    #[serde(default)]
    is_reference: bool,
}

async fn handle_upload(
    State(ctx): State<AppContext>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> ApiResult<IngestSummary> {
    let Json(req) = payload?;
    let summary =
        ingest::upload_document(&ctx, &req.name, &req.full_text, req.is_reference).await?;
    Ok(Json(summary))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    #[serde(default)]
    include_reference: bool,
}

async fn handle_list_templates(
    State(ctx): State<AppContext>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Vec<DocumentSummary>> {
    let Query(params) = params?;
    Ok(Json(
        documents::list_documents(&ctx, params.include_reference).await?,
    ))
}

async fn handle_get_template(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult<DocumentResponse> {
    Ok(Json(documents::get_document(&ctx, &id).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest {
    full_text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    message: String,
    template_id: String,
    span_count: usize,
}

async fn handle_update_template(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> ApiResult<UpdateResponse> {
    let Json(req) = payload?;
    let summary = ingest::update_text(&ctx, &id, &req.full_text).await?;
    Ok(Json(UpdateResponse {
        message: "Template updated successfully".to_string(),
        template_id: summary.document_id,
        span_count: summary.span_count,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteResponse {
    deleted: bool,
    template_id: String,
}

async fn handle_delete_template(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult<DeleteResponse> {
    ingest::delete_document(&ctx, &id).await?;
    Ok(Json(DeleteResponse {
        deleted: true,
        template_id: id,
    }))
}

// ============ Patch ============

/// Edits target either inline text or a stored document, never both.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatchTarget {
    #[serde(default)]
    full_text: Option<String>,
    #[serde(default)]
    template_id: Option<String>,
}

enum Target {
    Text(String),
    Document(String),
}

impl PatchTarget {
    fn resolve(self) -> Result<Target, ApiError> {
        match (self.full_text, self.template_id) {
            (Some(text), None) => Ok(Target::Text(text)),
            (None, Some(id)) => Ok(Target::Document(id)),
            (Some(_), Some(_)) => Err(ApiError::BadRequest(
                "provide either fullText or templateId, not both".to_string(),
            )),
            (None, None) => Err(ApiError::BadRequest(
                "fullText or templateId is required".to_string(),
            )),
        }
    }
}

#[derive(Deserialize)]
struct PatchRequest {
    instruction: String,
    #[serde(flatten)]
    target: PatchTarget,
}

async fn handle_patch(
    State(ctx): State<AppContext>,
    payload: Result<Json<PatchRequest>, JsonRejection>,
) -> ApiResult<PatchResponse> {
    let Json(req) = payload?;
    let response = match req.target.resolve()? {
        Target::Text(text) => patch::propose_patch(&ctx, &req.instruction, &text).await?,
        Target::Document(id) => {
            patch::propose_for_document(&ctx, &id, &req.instruction).await?
        }
    };
    Ok(Json(response))
}

#[derive(Deserialize)]
struct ApplyRequest {
    edits: Vec<VerifiedEdit>,
    /// Fail with 409 instead of skipping edits that no longer match.
    #[serde(default)]
    strict: bool,
    #[serde(flatten)]
    target: PatchTarget,
}

async fn handle_apply(
    State(ctx): State<AppContext>,
    payload: Result<Json<ApplyRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    let response = match req.target.resolve()? {
        Target::Text(text) => {
            Json(patch::apply_to_text(&text, &req.edits, req.strict)?).into_response()
        }
        Target::Document(id) => {
            Json(patch::apply_to_document(&ctx, &id, &req.edits, req.strict).await?)
                .into_response()
        }
    };
    Ok(response)
}

// ============ Search ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    #[serde(default)]
    query: String,
    #[serde(default)]
    k: Option<usize>,
    #[serde(default)]
    reference: ReferenceFilter,
    #[serde(default)]
    template_id: Option<String>,
}

async fn handle_search(
    State(ctx): State<AppContext>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Vec<SearchHit>> {
    let Query(params) = params?;
    let filters = SearchFilters {
        reference: params.reference,
        document_id: params.template_id,
    };
    Ok(Json(
        search::search_clauses(&ctx, &params.query, params.k, filters).await?,
    ))
}

// ============ Library ============

#[derive(Deserialize)]
struct LibraryLoadRequest {
    #[serde(default)]
    items: Option<Vec<LibraryFileEntry>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LibraryLoadResponse {
    loaded: usize,
    reference_clauses: i64,
}

async fn handle_library_load(
    State(ctx): State<AppContext>,
    payload: Result<Json<LibraryLoadRequest>, JsonRejection>,
) -> ApiResult<LibraryLoadResponse> {
    let Json(req) = payload?;
    let items = match req.items {
        Some(entries) => library::items_from_entries(entries)?,
        None => library::builtin_items(),
    };
    let loaded = library::load_items(&ctx, items).await?;
    let reference_clauses = ctx
        .store
        .count_vectors(true)
        .await
        .map_err(ClauseError::from)?;
    Ok(Json(LibraryLoadResponse {
        loaded,
        reference_clauses,
    }))
}

// ============ Clauses ============

#[derive(Deserialize)]
struct GenerateRequest {
    instruction: String,
}

async fn handle_generate(
    State(ctx): State<AppContext>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<GeneratedClause> {
    let Json(req) = payload?;
    Ok(Json(generate::generate_clause(&ctx, &req.instruction).await?))
}

#[derive(Deserialize)]
struct ClauseTextRequest {
    text: String,
}

#[derive(Serialize)]
struct ClauseTextResponse {
    result: String,
}

async fn handle_rewrite(
    State(ctx): State<AppContext>,
    payload: Result<Json<ClauseTextRequest>, JsonRejection>,
) -> ApiResult<ClauseTextResponse> {
    let Json(req) = payload?;
    let result = generate::rewrite_clause(&ctx, &req.text).await?;
    Ok(Json(ClauseTextResponse { result }))
}

async fn handle_summarize(
    State(ctx): State<AppContext>,
    payload: Result<Json<ClauseTextRequest>, JsonRejection>,
) -> ApiResult<ClauseTextResponse> {
    let Json(req) = payload?;
    let result = generate::summarize_clause(&ctx, &req.text).await?;
    Ok(Json(ClauseTextResponse { result }))
}
