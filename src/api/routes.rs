use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use super::auth::auth_routes;
use super::health::health_check;
use super::users::user_routes;
use super::vaccines::vaccine_routes;
use crate::auth::{cors_layer, jwt_auth_middleware, security_headers_layer};
use crate::handlers::Mediator;

/// Build the application router. With `require_auth` the user and vaccine
/// routes demand a valid bearer token.
pub fn create_routes(mediator: Mediator, require_auth: bool) -> Router {
    let mut records = Router::new()
        .nest("/api/user", user_routes())
        .nest("/api/vaccine", vaccine_routes());

    if require_auth {
        records = records.route_layer(middleware::from_fn_with_state(
            mediator.jwt().clone(),
            jwt_auth_middleware,
        ));
    }

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes())
        .merge(records)
        .layer(TraceLayer::new_for_http())
        .layer(security_headers_layer())
        .layer(cors_layer())
        .with_state(mediator)
}
