use std::sync::Arc;

use actix_web::{HttpResponse, Result as ActixResult, web};
use chrono::Utc;
use reveal::dealer::Choice;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::Limits,
    error::{Error, ErrorKind::Validation, MessageBody},
    identity::normalize,
    objective::{CreateObjective, ObjectiveSummary, SortBy},
    store::CommitmentStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CommitmentStore>,
    pub limits: Limits,
    pub recently_published_limit: usize,
}

#[derive(Serialize)]
struct CreatedResponse {
    objective_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CommitRequest {
    pub name: String,
    #[serde(rename = "Number")]
    pub number: i64,
}

#[derive(Serialize)]
struct CommitResponse {
    message: String,
    ciphertext: String,
    revealed: usize,
    closed: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub sort_by: SortBy,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    objectives: usize,
}

pub fn setup_routes(config: &mut web::ServiceConfig) {
    config
        .app_data(web::JsonConfig::default().error_handler(|err, _req| {
            Error::from_kind(Validation(err.to_string())).into()
        }))
        .app_data(web::QueryConfig::default().error_handler(|err, _req| {
            Error::from_kind(Validation(err.to_string())).into()
        }))
        .route("/", web::get().to(root))
        .route("/health", web::get().to(health))
        .route("/objective", web::post().to(create_objective))
        .route("/objective/{id}", web::get().to(get_objective))
        .route("/objective/{id}/points", web::get().to(list_points))
        .route("/objectives", web::get().to(list_objectives))
        .route("/commit/{id}", web::patch().to(commit))
        .route("/recently_published", web::get().to(recently_published));
}

async fn root() -> HttpResponse {
    HttpResponse::Ok().json(MessageBody {
        message: "AC2 Backend Running".to_owned(),
    })
}

async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        objectives: state.store.len(),
    })
}

async fn create_objective(
    state: web::Data<AppState>,
    body: web::Json<CreateObjective>,
) -> ActixResult<HttpResponse> {
    let draft = body.into_inner().into_draft(&state.limits, Utc::now())?;
    let store = Arc::clone(&state.store);

    let objective_id = web::block(move || store.create(draft, Utc::now())).await??;
    Ok(HttpResponse::Ok().json(CreatedResponse { objective_id }))
}

async fn get_objective(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    let store = Arc::clone(&state.store);

    let record = web::block(move || store.get(&id)).await??;
    Ok(HttpResponse::Ok().json(record.view(Utc::now())))
}

async fn list_points(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    let store = Arc::clone(&state.store);

    let points = web::block(move || store.list_points(&id)).await??;
    Ok(HttpResponse::Ok().json(points))
}

async fn list_objectives(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> ActixResult<HttpResponse> {
    let ListQuery { sort_by, limit } = query.into_inner();
    let store = Arc::clone(&state.store);

    let records = web::block(move || store.list(sort_by, limit)).await??;
    let now = Utc::now();
    let summaries: Vec<ObjectiveSummary> = records.iter().map(|r| r.summary(now)).collect();
    Ok(HttpResponse::Ok().json(summaries))
}

async fn commit(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<CommitRequest>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    let CommitRequest { name, number } = body.into_inner();

    let trimmed = normalize(&name);
    if trimmed.is_empty() || trimmed.chars().count() > state.limits.max_name_length {
        return Err(Error::from_kind(Validation(format!(
            "Name must be between 1 and {} characters.",
            state.limits.max_name_length
        )))
        .into());
    }
    let name = trimmed.to_owned();
    let choice = Choice::from_number(number).map_err(Error::from)?;
    debug!(objective = %id, ?choice, "commit request");

    let store = Arc::clone(&state.store);
    let outcome = web::block(move || store.add(&id, &name, choice, Utc::now())).await??;

    Ok(HttpResponse::Ok().json(CommitResponse {
        message: "Commitment stored.".to_owned(),
        ciphertext: outcome.ciphertext,
        revealed: outcome.revealed,
        closed: outcome.closed,
    }))
}

async fn recently_published(
    state: web::Data<AppState>,
    query: web::Query<LimitQuery>,
) -> ActixResult<HttpResponse> {
    let limit = query.limit.unwrap_or(state.recently_published_limit);
    let store = Arc::clone(&state.store);

    let records = web::block(move || store.recently_published(limit)).await??;
    let now = Utc::now();
    let summaries: Vec<ObjectiveSummary> = records.iter().map(|r| r.summary(now)).collect();
    Ok(HttpResponse::Ok().json(summaries))
}
