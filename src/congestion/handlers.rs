use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{error, info, instrument};

use super::{model::FacilityArea, repo, scrape};
use crate::{
    auth::AuthUser,
    config::CongestionSource,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/congestion", get(get_congestion))
}

#[derive(Debug, Serialize)]
pub struct CongestionResponse {
    pub areas: Vec<FacilityArea>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub status: &'static str,
}

async fn load_areas(state: &AppState) -> AppResult<Vec<FacilityArea>> {
    match state.config.congestion_source {
        CongestionSource::Snapshot => Ok(repo::snapshot_areas(&state.db).await?),
        CongestionSource::Live => {
            let html = scrape::fetch_page(&state.http, &state.config.congestion_url)
                .await
                .map_err(|e| {
                    error!(error = %e, "facility usage fetch failed");
                    AppError::Upstream(format!("facility usage page: {e}"))
                })?;
            Ok(scrape::parse_areas(&html)?)
        }
    }
}

#[instrument(skip(state, _user))]
pub async fn get_congestion(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let areas = load_areas(&state).await?;
    if areas.is_empty() {
        return Err(AppError::Upstream("no facility data found".into()));
    }
    info!(areas = areas.len(), source = ?state.config.congestion_source, "congestion feed");

    let body = CongestionResponse {
        areas,
        timestamp: OffsetDateTime::now_utc(),
        status: "success",
    };
    Ok(([(header::CACHE_CONTROL, "public, max-age=30")], Json(body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn feed_requires_a_token() {
        let res = routes()
            .with_state(AppState::fake())
            .oneshot(Request::get("/congestion").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn response_shape() {
        let body = CongestionResponse {
            areas: vec![crate::congestion::model::closed_area("Pool".into(), "9:00 AM".into())],
            timestamp: OffsetDateTime::UNIX_EPOCH,
            status: "success",
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["status"], "success");
        assert_eq!(v["timestamp"], "1970-01-01T00:00:00Z");
        assert_eq!(v["areas"][0]["congestionLevel"], "Closed");
        assert_eq!(v["areas"][0]["isClosed"], true);
        assert_eq!(v["areas"][0]["lastUpdated"], "9:00 AM");
    }
}
