use axum::{Router, routing::{delete, get}};
use crate::{AppState, controllers::items_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/api/items",
            get(items_controller::list_items).post(items_controller::add_item),
        )
        .route("/api/items/:id", delete(items_controller::remove_item))
}
