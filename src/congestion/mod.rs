pub mod handlers;
pub mod model;
pub mod repo;
pub mod scrape;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
