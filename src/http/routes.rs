//! Route table and per-route authorization wiring.
//!
//! Gates are attached with `route_layer` so they run only once a route has
//! matched, after authentication has populated the principal. Routes that
//! establish identity (registration, activation, token issuance) carry no
//! gate.

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post, put, MethodRouter},
    Router,
};

use crate::http::handlers::{dispatch, healthcheck, Endpoint};
use crate::http::server::AppState;
use crate::observability::metrics::debug_vars;
use crate::security::authorization::{authorize, Gate, Requirement};
use crate::security::principal::{MOVIES_READ, MOVIES_WRITE};
use crate::store::PermissionStore;

pub fn routes(permissions: &Arc<dyn PermissionStore>) -> Router<AppState> {
    let read = Gate::new(Requirement::Permission(MOVIES_READ), permissions.clone());
    let write = Gate::new(Requirement::Permission(MOVIES_WRITE), permissions.clone());

    Router::new()
        .route("/v1/healthcheck", get(healthcheck))
        .route(
            "/v1/movies",
            gated(get(dispatch(Endpoint::ListMovies)), &read)
                .merge(gated(post(dispatch(Endpoint::CreateMovie)), &write)),
        )
        .route(
            "/v1/movies/{id}",
            gated(get(dispatch(Endpoint::ShowMovie)), &read)
                .merge(gated(patch(dispatch(Endpoint::UpdateMovie)), &write))
                .merge(gated(delete(dispatch(Endpoint::DeleteMovie)), &write)),
        )
        .route("/v1/users", post(dispatch(Endpoint::RegisterUser)))
        .route("/v1/users/activated", put(dispatch(Endpoint::ActivateUser)))
        .route(
            "/v1/tokens/authentication",
            post(dispatch(Endpoint::CreateAuthenticationToken)),
        )
        .route("/debug/vars", get(debug_vars))
}

fn gated(route: MethodRouter<AppState>, gate: &Gate) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(gate.clone(), authorize))
}
