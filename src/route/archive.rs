use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use catalog::{BroadcastRecord, SearchSort};

use crate::error::AppError;
use crate::route::AppState;

pub fn route() -> Router<AppState> {
    Router::new()
        .route("/api/broadcasts", get(index))
        .route("/api/broadcasts/search", get(search))
        .route("/api/live", get(live))
}

async fn index(State(state): State<AppState>) -> crate::result::Result<Json<Vec<BroadcastRecord>>> {
    Ok(Json(state.catalog.list_archived()?))
}

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(default)]
    sort: SearchSort,
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> crate::result::Result<Json<Vec<BroadcastRecord>>> {
    Ok(Json(state.catalog.search(&params.q, params.sort)?))
}

async fn live(State(state): State<AppState>) -> crate::result::Result<Json<BroadcastRecord>> {
    match state.catalog.find_live()? {
        Some(rec) => Ok(Json(rec)),
        None => Err(AppError::broadcast_not_found("no live broadcast")),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use catalog::{Catalog, NewBroadcast};

    use crate::broadcast::LiveSession;
    use crate::route::AppState;

    async fn app_state(catalog: Arc<Catalog>) -> AppState {
        let dir = tempfile::tempdir().unwrap();
        AppState {
            catalog: catalog.clone(),
            session: Arc::new(LiveSession::new(catalog, dir.path(), "webm")),
        }
    }

    fn seed(catalog: &Catalog, title: &str, live: bool) -> i64 {
        let id = catalog
            .create(&NewBroadcast {
                title: title.to_string(),
                broadcast_date: "2024-01-01".to_string(),
                start_time: "08:00".to_string(),
                filename: format!("siaran_{}.webm", title),
            })
            .unwrap();
        if !live {
            catalog.finalize(id, "09:00", Some(60)).unwrap();
        }
        id
    }

    #[tokio::test]
    async fn index_lists_archived_only() {
        let catalog = Arc::new(Catalog::open_in_memory().unwrap());
        seed(&catalog, "done", false);
        seed(&catalog, "on-air", true);
        let app = super::route().with_state(app_state(catalog).await);

        let response = app
            .oneshot(Request::get("/api/broadcasts").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let records: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["title"], "done");
    }

    #[tokio::test]
    async fn search_filters_by_query() {
        let catalog = Arc::new(Catalog::open_in_memory().unwrap());
        seed(&catalog, "Morning", false);
        seed(&catalog, "Evening", false);
        let app = super::route().with_state(app_state(catalog).await);

        let response = app
            .oneshot(
                Request::get("/api/broadcasts/search?q=morn&sort=title_asc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let records: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["title"], "Morning");
    }

    #[tokio::test]
    async fn live_returns_404_when_idle() {
        let catalog = Arc::new(Catalog::open_in_memory().unwrap());
        seed(&catalog, "done", false);
        let app = super::route().with_state(app_state(catalog).await);

        let response = app
            .oneshot(Request::get("/api/live").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn live_returns_current_broadcast() {
        let catalog = Arc::new(Catalog::open_in_memory().unwrap());
        let id = seed(&catalog, "on-air", true);
        let app = super::route().with_state(app_state(catalog).await);

        let response = app
            .oneshot(Request::get("/api/live").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let record: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(record["id"], id);
        assert_eq!(record["is_live"], true);
    }
}
