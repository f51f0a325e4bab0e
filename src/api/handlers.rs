use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::TopologyError;
use crate::logic::{
    BreakerFilter, BreakerLoadSummary, BreakerPath, CableReport, EngineSettings, LoadDetails,
    LoadFilter, PanelLoadSummary, PanelPath, TopologyOperations, TopologyQueries,
};
use crate::model::{
    CircuitBreaker, Id, Load, NewCircuitBreaker, NewLoad, NewPanel, NewPowerSource, Panel,
    PanelType, PowerSource,
};
use crate::store::traits::Store;

/// Shared handler state: the store plus the settings for derived figures
pub struct AppContext<S> {
    pub store: S,
    pub settings: EngineSettings,
}

impl<S> AppContext<S> {
    pub fn new(store: S, settings: EngineSettings) -> Self {
        Self { store, settings }
    }
}

pub type AppState<S> = Arc<AppContext<S>>;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub id: Id,
}

#[derive(Debug, Deserialize)]
pub struct SetBreakerRequest {
    pub breaker_id: Id,
}

#[derive(Debug, Deserialize)]
pub struct SetParentRequest {
    pub parent_panel: Id,
}

#[derive(Debug, Deserialize)]
pub struct SetPanelTypeRequest {
    pub panel_type: PanelType,
}

#[derive(Debug, Deserialize)]
pub struct FeedingBreakersRequest {
    pub feeding_breakers: BTreeSet<Id>,
}

/// Map engine errors onto HTTP responses
fn error_response(error: TopologyError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &error {
        TopologyError::Cycle(_) | TopologyError::Conflict(_) => StatusCode::CONFLICT,
        TopologyError::InvalidTopology(_)
        | TopologyError::Validation(_)
        | TopologyError::UnknownCrossSection { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        TopologyError::NotFound { .. } => StatusCode::NOT_FOUND,
        TopologyError::Io(_) | TopologyError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::new(&error.to_string())))
}

fn deleted(kind: &str, id: Id) -> Json<DeleteResponse> {
    Json(DeleteResponse {
        message: format!("{} deleted", kind),
        id,
    })
}

// Power sources

pub async fn list_power_sources<S: Store>(
    State(state): State<AppState<S>>,
) -> ApiResult<ListResponse<PowerSource>> {
    let items = state
        .store
        .read(|t| Ok(TopologyQueries::power_sources(t)))
        .await
        .map_err(error_response)?;
    Ok(Json(items.into()))
}

pub async fn create_power_source<S: Store>(
    State(state): State<AppState<S>>,
    RequestJson(input): RequestJson<NewPowerSource>,
) -> ApiResult<PowerSource> {
    state
        .store
        .transact(move |t| TopologyOperations::create_power_source(t, input))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn get_power_source<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<PowerSource> {
    state
        .store
        .read(move |t| t.require_power_source(&id).cloned())
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn update_power_source<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(input): RequestJson<NewPowerSource>,
) -> ApiResult<PowerSource> {
    state
        .store
        .transact(move |t| TopologyOperations::update_power_source(t, &id, input))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn delete_power_source<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<DeleteResponse> {
    let target = id.clone();
    state
        .store
        .transact(move |t| TopologyOperations::delete_power_source(t, &target))
        .await
        .map_err(error_response)?;
    Ok(deleted("Power source", id))
}

pub async fn list_source_panels<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<ListResponse<Panel>> {
    let items = state
        .store
        .read(move |t| TopologyQueries::panels_of_source(t, &id))
        .await
        .map_err(error_response)?;
    Ok(Json(items.into()))
}

pub async fn add_source_panel<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(input): RequestJson<NewPanel>,
) -> ApiResult<Panel> {
    state
        .store
        .transact(move |t| TopologyOperations::add_panel_to_source(t, &id, input))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn set_source_main_breaker<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(request): RequestJson<SetBreakerRequest>,
) -> ApiResult<PowerSource> {
    state
        .store
        .transact(move |t| TopologyOperations::set_source_main_breaker(t, &id, &request.breaker_id))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn get_source_cable<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<CableReport> {
    let settings = state.settings;
    state
        .store
        .read(move |t| TopologyQueries::source_cable(t, &id, &settings))
        .await
        .map(Json)
        .map_err(error_response)
}

// Panels

pub async fn list_panels<S: Store>(State(state): State<AppState<S>>) -> ApiResult<ListResponse<Panel>> {
    let items = state
        .store
        .read(|t| Ok(TopologyQueries::panels(t)))
        .await
        .map_err(error_response)?;
    Ok(Json(items.into()))
}

pub async fn create_panel<S: Store>(
    State(state): State<AppState<S>>,
    RequestJson(input): RequestJson<NewPanel>,
) -> ApiResult<Panel> {
    state
        .store
        .transact(move |t| TopologyOperations::create_panel(t, input))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn get_panel<S: Store>(State(state): State<AppState<S>>, Path(id): Path<Id>) -> ApiResult<Panel> {
    state
        .store
        .read(move |t| t.require_panel(&id).cloned())
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn update_panel<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(input): RequestJson<NewPanel>,
) -> ApiResult<Panel> {
    state
        .store
        .transact(move |t| TopologyOperations::update_panel(t, &id, input))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn delete_panel<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<DeleteResponse> {
    let target = id.clone();
    state
        .store
        .transact(move |t| TopologyOperations::delete_panel(t, &target))
        .await
        .map_err(error_response)?;
    Ok(deleted("Panel", id))
}

pub async fn list_panel_breakers<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<ListResponse<CircuitBreaker>> {
    let items = state
        .store
        .read(move |t| TopologyQueries::breakers_of_panel(t, &id))
        .await
        .map_err(error_response)?;
    Ok(Json(items.into()))
}

pub async fn add_panel_breaker<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(input): RequestJson<NewCircuitBreaker>,
) -> ApiResult<CircuitBreaker> {
    state
        .store
        .transact(move |t| TopologyOperations::add_breaker_to_panel(t, &id, input))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn list_child_panels<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<ListResponse<Panel>> {
    let items = state
        .store
        .read(move |t| TopologyQueries::child_panels(t, &id, false))
        .await
        .map_err(error_response)?;
    Ok(Json(items.into()))
}

pub async fn list_all_child_panels<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<ListResponse<Panel>> {
    let items = state
        .store
        .read(move |t| TopologyQueries::child_panels(t, &id, true))
        .await
        .map_err(error_response)?;
    Ok(Json(items.into()))
}

pub async fn add_child_panel<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(input): RequestJson<NewPanel>,
) -> ApiResult<Panel> {
    state
        .store
        .transact(move |t| TopologyOperations::add_child_panel(t, &id, input))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn set_panel_main_breaker<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(request): RequestJson<SetBreakerRequest>,
) -> ApiResult<Panel> {
    state
        .store
        .transact(move |t| TopologyOperations::set_panel_main_breaker(t, &id, &request.breaker_id))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn set_panel_feeder_breaker<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(request): RequestJson<SetBreakerRequest>,
) -> ApiResult<Panel> {
    state
        .store
        .transact(move |t| TopologyOperations::set_feeder_breaker(t, &id, &request.breaker_id))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn set_panel_parent<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(request): RequestJson<SetParentRequest>,
) -> ApiResult<Panel> {
    state
        .store
        .transact(move |t| TopologyOperations::set_panel_parent(t, &id, &request.parent_panel))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn set_panel_type<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(request): RequestJson<SetPanelTypeRequest>,
) -> ApiResult<Panel> {
    state
        .store
        .transact(move |t| TopologyOperations::set_panel_type(t, &id, request.panel_type))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn get_panel_full_path<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<PanelPath> {
    state
        .store
        .read(move |t| TopologyQueries::panel_path(t, &id))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn get_panel_total_load<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<PanelLoadSummary> {
    state
        .store
        .read(move |t| TopologyQueries::panel_load(t, &id))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn get_panel_cable<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<CableReport> {
    let settings = state.settings;
    state
        .store
        .read(move |t| TopologyQueries::panel_cable(t, &id, &settings))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn list_panel_loads<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<ListResponse<Load>> {
    let items = state
        .store
        .read(move |t| TopologyQueries::loads_of_panel(t, &id))
        .await
        .map_err(error_response)?;
    Ok(Json(items.into()))
}

// Circuit breakers

pub async fn list_breakers<S: Store>(
    State(state): State<AppState<S>>,
    Query(filter): Query<BreakerFilter>,
) -> ApiResult<ListResponse<CircuitBreaker>> {
    let items = state
        .store
        .read(move |t| {
            if let Some(panel_id) = &filter.panel_id {
                t.require_panel(panel_id)?;
            }
            Ok(TopologyQueries::breakers(t, &filter))
        })
        .await
        .map_err(error_response)?;
    Ok(Json(items.into()))
}

pub async fn create_breaker<S: Store>(
    State(state): State<AppState<S>>,
    RequestJson(input): RequestJson<NewCircuitBreaker>,
) -> ApiResult<CircuitBreaker> {
    state
        .store
        .transact(move |t| TopologyOperations::create_breaker(t, input))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn get_breaker<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<CircuitBreaker> {
    state
        .store
        .read(move |t| t.require_breaker(&id).cloned())
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn update_breaker<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(input): RequestJson<NewCircuitBreaker>,
) -> ApiResult<CircuitBreaker> {
    state
        .store
        .transact(move |t| TopologyOperations::update_breaker(t, &id, input))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn delete_breaker<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<DeleteResponse> {
    let target = id.clone();
    state
        .store
        .transact(move |t| TopologyOperations::delete_breaker(t, &target))
        .await
        .map_err(error_response)?;
    Ok(deleted("Circuit breaker", id))
}

pub async fn list_breaker_loads<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<ListResponse<Load>> {
    let items = state
        .store
        .read(move |t| TopologyQueries::loads_of_breaker(t, &id))
        .await
        .map_err(error_response)?;
    Ok(Json(items.into()))
}

pub async fn add_breaker_load<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(input): RequestJson<NewLoad>,
) -> ApiResult<Load> {
    state
        .store
        .transact(move |t| TopologyOperations::add_load_to_breaker(t, &id, input))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn get_feeding_breakers<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<ListResponse<CircuitBreaker>> {
    let items = state
        .store
        .read(move |t| TopologyQueries::feeding_breakers(t, &id))
        .await
        .map_err(error_response)?;
    Ok(Json(items.into()))
}

pub async fn set_feeding_breakers<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(request): RequestJson<FeedingBreakersRequest>,
) -> ApiResult<CircuitBreaker> {
    state
        .store
        .transact(move |t| TopologyOperations::set_feeding_breakers(t, &id, request.feeding_breakers))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn get_fed_breakers<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<ListResponse<CircuitBreaker>> {
    let items = state
        .store
        .read(move |t| TopologyQueries::fed_breakers(t, &id))
        .await
        .map_err(error_response)?;
    Ok(Json(items.into()))
}

pub async fn get_breaker_full_path<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<BreakerPath> {
    state
        .store
        .read(move |t| TopologyQueries::breaker_path(t, &id))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn get_breaker_total_load<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<BreakerLoadSummary> {
    let settings = state.settings;
    state
        .store
        .read(move |t| TopologyQueries::breaker_load(t, &id, &settings))
        .await
        .map(Json)
        .map_err(error_response)
}

// Loads

pub async fn list_loads<S: Store>(
    State(state): State<AppState<S>>,
    Query(filter): Query<LoadFilter>,
) -> ApiResult<ListResponse<Load>> {
    let items = state
        .store
        .read(move |t| {
            if let Some(panel_id) = &filter.panel_id {
                t.require_panel(panel_id)?;
            }
            Ok(TopologyQueries::loads(t, &filter))
        })
        .await
        .map_err(error_response)?;
    Ok(Json(items.into()))
}

pub async fn create_load<S: Store>(
    State(state): State<AppState<S>>,
    RequestJson(input): RequestJson<NewLoad>,
) -> ApiResult<Load> {
    state
        .store
        .transact(move |t| TopologyOperations::create_load(t, input))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn get_load<S: Store>(State(state): State<AppState<S>>, Path(id): Path<Id>) -> ApiResult<Load> {
    state
        .store
        .read(move |t| t.require_load(&id).cloned())
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn update_load<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(input): RequestJson<NewLoad>,
) -> ApiResult<Load> {
    state
        .store
        .transact(move |t| TopologyOperations::update_load(t, &id, input))
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn delete_load<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<DeleteResponse> {
    let target = id.clone();
    state
        .store
        .transact(move |t| TopologyOperations::delete_load(t, &target))
        .await
        .map_err(error_response)?;
    Ok(deleted("Load", id))
}

pub async fn get_load_details<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<LoadDetails> {
    let settings = state.settings;
    state
        .store
        .read(move |t| TopologyQueries::load_details(t, &id, &settings))
        .await
        .map(Json)
        .map_err(error_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityKind;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (TopologyError::Cycle("a".into()), StatusCode::CONFLICT),
            (TopologyError::Conflict("a".into()), StatusCode::CONFLICT),
            (TopologyError::InvalidTopology("a".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (TopologyError::Validation("a".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (
                TopologyError::not_found(EntityKind::Panel, &"p".to_string()),
                StatusCode::NOT_FOUND,
            ),
        ];
        for (error, expected) in cases {
            let (status, body) = error_response(error);
            assert_eq!(status, expected);
            assert!(!body.error.is_empty());
        }
    }

    #[test]
    fn test_list_response_counts_items() {
        let response: ListResponse<u8> = vec![1, 2, 3].into();
        assert_eq!(response.total, 3);
    }
}
