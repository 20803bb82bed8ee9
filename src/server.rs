//! HTTP facade over a [`StatsStore`].
//!
//! Store calls are blocking file I/O and run on the blocking pool, one task
//! per request. Read failures degrade to empty results; an update that cannot
//! read the store is a `503`, and a failed write is a `500`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Form, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::StoreError;
use crate::record::{Metric, Observation};
use crate::render;
use crate::store::StatsStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<StatsStore>,
    pub default_course: Option<String>,
}

impl AppState {
    pub fn new(store: StatsStore, default_course: Option<String>) -> Self {
        AppState {
            store: Arc::new(store),
            default_course,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/get_universities/:course", get(get_universities))
        .route("/get_courses/:university", get(get_courses))
        .route("/update", get(update_form).post(submit_update))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, store = %state.store.describe(), "Listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

async fn with_store<T, F>(state: &AppState, op: F) -> Result<T>
where
    F: FnOnce(&StatsStore) -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    let result = tokio::task::spawn_blocking(move || op(&store)).await?;
    Ok(result?)
}

async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

#[derive(Debug, Deserialize)]
struct IndexQuery {
    course: Option<String>,
}

async fn index(State(state): State<AppState>, Query(query): Query<IndexQuery>) -> Response {
    let course = query
        .course
        .filter(|c| !c.trim().is_empty())
        .or_else(|| state.default_course.clone());

    let wanted = course.clone();
    let records = with_store(&state, move |store| match wanted {
        Some(c) => store.find_by_course(&c),
        None => store.load().map(|all| all.to_vec()),
    })
    .await
    .unwrap_or_else(|e| {
        error!(error = %e, "Index could not read records, rendering empty table");
        Vec::new()
    });

    Html(render::index_page(course.as_deref(), &records)).into_response()
}

fn not_found(message: String) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
}

async fn get_universities(State(state): State<AppState>, Path(course): Path<String>) -> Response {
    let query = course.clone();
    match with_store(&state, move |store| store.find_by_course(&query)).await {
        Ok(records) if !records.is_empty() => Json(records).into_response(),
        Ok(_) => not_found(format!("no universities found for course {course:?}")),
        Err(e) => {
            error!(error = %e, course = %course, "Record lookup failed");
            not_found("no data available".to_string())
        }
    }
}

async fn get_courses(State(state): State<AppState>, Path(university): Path<String>) -> Response {
    let query = university.clone();
    let courses = with_store(&state, move |store| store.courses_for_university(&query))
        .await
        .map(|set| set.into_iter().collect::<Vec<_>>())
        .unwrap_or_else(|e| {
            error!(error = %e, university = %university, "Course lookup failed");
            Vec::new()
        });

    Json(courses).into_response()
}

async fn update_form(State(state): State<AppState>) -> Response {
    let lists = with_store(&state, |store| Ok((store.universities()?, store.courses()?)))
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "Update form could not read records");
            Default::default()
        });

    Html(render::update_page(&lists.0, &lists.1)).into_response()
}

/// A rejected form field.
#[derive(Error, Debug, PartialEq)]
pub enum FormError {
    #[error("missing required field `{0}`")]
    Missing(&'static str),

    #[error("field `{field}` must be a finite number, got {value:?}")]
    NotNumeric { field: &'static str, value: String },
}

/// A validated `POST /update` body.
#[derive(Debug, PartialEq)]
pub struct Submission {
    pub university: String,
    pub course: String,
    pub observation: Observation,
}

fn required_text(
    fields: &HashMap<String, String>,
    name: &'static str,
) -> Result<String, FormError> {
    match fields.get(name) {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(FormError::Missing(name)),
    }
}

fn number(
    fields: &HashMap<String, String>,
    name: &'static str,
) -> Result<Option<f64>, FormError> {
    let Some(raw) = fields.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(FormError::NotNumeric {
            field: name,
            value: raw.to_string(),
        }),
    }
}

/// Validates raw form fields. Blank optional scores count as not reported.
pub fn parse_submission(fields: &HashMap<String, String>) -> Result<Submission, FormError> {
    let university = required_text(fields, "university")?;
    let course = required_text(fields, "course")?;

    let required = |m: Metric| -> Result<f64, FormError> {
        number(fields, m.key())?.ok_or(FormError::Missing(m.key()))
    };
    let mut observation = Observation::new(required(Metric::Experience)?, required(Metric::Gpa)?);

    for m in Metric::ALL.into_iter().filter(|m| !m.is_required()) {
        if let Some(v) = number(fields, m.key())? {
            observation = observation.with(m, v);
        }
    }

    Ok(Submission {
        university,
        course,
        observation,
    })
}

async fn submit_update(
    State(state): State<AppState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let submission = match parse_submission(&fields) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "Rejected update submission");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let Submission {
        university,
        course,
        observation,
    } = submission;
    let result = with_store(&state, move |store| {
        store.apply_observation(&university, &course, &observation)
    })
    .await;

    match result {
        Ok(_) => Redirect::to("/").into_response(),
        Err(e) => {
            error!(error = %e, "Update failed");
            update_failure(&e).into_response()
        }
    }
}

/// `503` when the store could not be read, `500` when the write itself failed.
fn update_failure(err: &anyhow::Error) -> (StatusCode, &'static str) {
    match err.downcast_ref::<StoreError>() {
        Some(e) if e.is_unavailable() => (
            StatusCode::SERVICE_UNAVAILABLE,
            "statistics are unavailable, please try again later",
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed to update record, please resubmit",
        ),
    }
}
