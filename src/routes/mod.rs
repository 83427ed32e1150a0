use axum::Router;
use tower_http::services::ServeDir;

use crate::AppState;

pub mod items_routes;

pub fn app(state: AppState) -> Router {
    let router = Router::<AppState>::new();

    let router = items_routes::add_routes(router);

    // ServeDir answers "/" with index.html from the static dir
    router
        .fallback_service(ServeDir::new(&state.settings.static_dir))
        .with_state(state)
}
