use axum::{
    routing::{get, post},
    Router,
};

use crate::api::handlers::{self, AppState};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Power sources
        .route(
            "/powersources",
            get(handlers::list_power_sources::<S>).post(handlers::create_power_source::<S>),
        )
        .route(
            "/powersources/:id",
            get(handlers::get_power_source::<S>)
                .put(handlers::update_power_source::<S>)
                .delete(handlers::delete_power_source::<S>),
        )
        .route(
            "/powersources/:id/panels",
            get(handlers::list_source_panels::<S>).post(handlers::add_source_panel::<S>),
        )
        .route(
            "/powersources/:id/set_main_breaker",
            post(handlers::set_source_main_breaker::<S>),
        )
        .route("/powersources/:id/cable", get(handlers::get_source_cable::<S>))
        // Panels
        .route(
            "/panels",
            get(handlers::list_panels::<S>).post(handlers::create_panel::<S>),
        )
        .route(
            "/panels/:id",
            get(handlers::get_panel::<S>)
                .put(handlers::update_panel::<S>)
                .delete(handlers::delete_panel::<S>),
        )
        .route(
            "/panels/:id/breakers",
            get(handlers::list_panel_breakers::<S>).post(handlers::add_panel_breaker::<S>),
        )
        .route(
            "/panels/:id/child_panels",
            get(handlers::list_child_panels::<S>).post(handlers::add_child_panel::<S>),
        )
        .route(
            "/panels/:id/all_child_panels",
            get(handlers::list_all_child_panels::<S>),
        )
        .route("/panels/:id/loads", get(handlers::list_panel_loads::<S>))
        .route(
            "/panels/:id/set_main_breaker",
            post(handlers::set_panel_main_breaker::<S>),
        )
        .route(
            "/panels/:id/set_feeder_breaker",
            post(handlers::set_panel_feeder_breaker::<S>),
        )
        .route("/panels/:id/set_parent", post(handlers::set_panel_parent::<S>))
        .route("/panels/:id/set_type", post(handlers::set_panel_type::<S>))
        .route("/panels/:id/full_path", get(handlers::get_panel_full_path::<S>))
        .route("/panels/:id/total_load", get(handlers::get_panel_total_load::<S>))
        .route("/panels/:id/cable", get(handlers::get_panel_cable::<S>))
        // Circuit breakers
        .route(
            "/circuitbreakers",
            get(handlers::list_breakers::<S>).post(handlers::create_breaker::<S>),
        )
        .route(
            "/circuitbreakers/:id",
            get(handlers::get_breaker::<S>)
                .put(handlers::update_breaker::<S>)
                .delete(handlers::delete_breaker::<S>),
        )
        .route(
            "/circuitbreakers/:id/loads",
            get(handlers::list_breaker_loads::<S>).post(handlers::add_breaker_load::<S>),
        )
        .route(
            "/circuitbreakers/:id/feeding_breakers",
            get(handlers::get_feeding_breakers::<S>).put(handlers::set_feeding_breakers::<S>),
        )
        .route(
            "/circuitbreakers/:id/fed_breakers",
            get(handlers::get_fed_breakers::<S>),
        )
        .route(
            "/circuitbreakers/:id/full_path",
            get(handlers::get_breaker_full_path::<S>),
        )
        .route(
            "/circuitbreakers/:id/total_load",
            get(handlers::get_breaker_total_load::<S>),
        )
        // Loads
        .route(
            "/loads",
            get(handlers::list_loads::<S>).post(handlers::create_load::<S>),
        )
        .route(
            "/loads/:id",
            get(handlers::get_load::<S>)
                .put(handlers::update_load::<S>)
                .delete(handlers::delete_load::<S>),
        )
        .route("/loads/:id/details", get(handlers::get_load_details::<S>))
}
