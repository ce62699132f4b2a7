// Presentation layer - HTTP gateway for the dashboard views
pub mod app_state;
pub mod form_upload;
pub mod handlers;
pub mod http_response;
pub mod live_stream;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::*;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route(
            "/api/session",
            get(current_session).post(login).delete(logout),
        )
        .route("/api/viewers", post(open_viewer))
        .route("/api/live", get(live))
        .route("/api/live/stream", get(live_stream))
        .route("/api/charts", get(charts))
        .route("/api/charts/filter", post(submit_filter))
        .route("/api/charts/stream", get(chart_stream))
        .route("/api/stations/operative", get(operative_stations))
        .route("/api/map", get(watersheds))
        .route("/api/map/:microcuenca", get(station_map))
        .route(
            "/api/microcuencas",
            get(list_microcuencas).post(create_microcuenca),
        )
        .route(
            "/api/microcuencas/:id",
            get(get_microcuenca).put(update_microcuenca),
        )
        .route("/api/microcuencas/:id/toggle", post(toggle_microcuenca))
        .route("/api/microcuencas/:id/stations", get(list_stations))
        .route("/api/stations", post(create_station))
        .route("/api/stations/:id", get(get_station).put(update_station))
        .route("/api/stations/:id/status", post(change_station_status))
        .route("/api/variables", get(list_variables).post(create_variable))
        .route("/api/variables/:id", get(get_variable).put(update_variable))
        .route("/api/variables/:id/toggle", post(toggle_variable))
        .route(
            "/api/administrators",
            get(list_administrators).post(create_administrator),
        )
        .route(
            "/api/administrators/:id",
            get(get_administrator).put(update_administrator),
        )
        .route("/api/administrators/:id/status", post(set_account_status))
        .route("/api/profile/password", post(change_password))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::admin_service::AdminService;
    use crate::application::live_service::LiveMeasurementsService;
    use crate::application::map_service::StationMapService;
    use crate::application::observatory_repository::EntityKind;
    use crate::application::session_service::SessionStore;
    use crate::application::testing::{FakeRepository, administrator};
    use crate::infrastructure::config::AssetUrls;
    use crate::infrastructure::fake_backend::serve;
    use reqwest::StatusCode;
    use reqwest::multipart::{Form, Part};
    use serde_json::{Value, json};
    use std::time::Duration;

    struct Gateway {
        base: String,
        repo: Arc<FakeRepository>,
        state: Arc<AppState>,
        http: reqwest::Client,
    }

    impl Gateway {
        async fn start() -> Self {
            let repo = Arc::new(FakeRepository::default());
            let assets = AssetUrls::new("http://obs.local");
            let state = Arc::new(AppState {
                sessions: SessionStore::new(repo.clone(), None),
                admin: AdminService::new(repo.clone(), assets.clone()),
                maps: StationMapService::new(repo.clone(), assets.clone()),
                live: Arc::new(LiveMeasurementsService::new(repo.clone(), assets, None)),
                service_token: None,
            });
            let base = serve(router(state.clone())).await;
            Self {
                base,
                repo,
                state,
                http: reqwest::Client::new(),
            }
        }

        fn url(&self, path: &str) -> String {
            format!("{}{}", self.base, path)
        }

        async fn login(&self) -> String {
            let body: Value = self
                .http
                .post(self.url("/api/session"))
                .json(&json!({"email": "ana@unl.edu.ec", "password": "secreto"}))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            body["token"].as_str().unwrap().to_string()
        }
    }

    #[tokio::test]
    async fn test_signed_in_listing() {
        let gateway = Gateway::start().await;
        *gateway.repo.administrators.lock().unwrap() =
            vec![administrator("u2", "Luis", "luis@unl.edu.ec")];
        let token = gateway.login().await;

        let response = gateway
            .http
            .get(gateway.url("/api/administrators?search=luis"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page: Value = response.json().await.unwrap();
        assert_eq!(page["total_items"], 1);
        assert_eq!(
            page["items"][0]["picture"],
            "http://obs.local/images/users/USUARIO_ICONO.png"
        );
    }

    #[tokio::test]
    async fn test_anonymous_admin_route_redirects_to_login() {
        let gateway = Gateway::start().await;

        let response = gateway
            .http
            .get(gateway.url("/api/microcuencas"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["redirect"], "/admin");
    }

    #[tokio::test]
    async fn test_expired_token_clears_session() {
        let gateway = Gateway::start().await;
        let token = gateway.login().await;
        gateway.repo.fail_with(401, "Token no valido o expirado");

        let response = gateway
            .http
            .get(gateway.url("/api/variables"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["redirect"], "/admin");
        assert!(gateway.state.sessions.session(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_viewer_chart_flow() {
        let gateway = Gateway::start().await;
        let viewer: Value = gateway
            .http
            .post(gateway.url("/api/viewers"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let viewer = viewer["viewer"].as_str().unwrap().to_string();

        let invalid = gateway
            .http
            .post(gateway.url("/api/charts/filter"))
            .bearer_auth(&viewer)
            .json(&json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(gateway.repo.measurement_calls(), 0);

        let submitted: Value = gateway
            .http
            .post(gateway.url("/api/charts/filter"))
            .bearer_auth(&viewer)
            .json(&json!({"scale": "hora"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(submitted["generation"], 1);

        let mut status = String::new();
        for _ in 0..50 {
            let panel: Value = gateway
                .http
                .get(gateway.url("/api/charts"))
                .bearer_auth(&viewer)
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            status = panel["status"].as_str().unwrap_or_default().to_string();
            if status != "loading" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status, "empty");
    }

    #[tokio::test]
    async fn test_station_created_from_multipart() {
        let gateway = Gateway::start().await;
        let token = gateway.login().await;

        let form = Form::new()
            .text("microcuenca_id", "m1")
            .text("name", "norte")
            .text("description", "Estacion norte")
            .text("status", "OPERATIVA")
            .text("longitude", "-79.2")
            .text("latitude", "-4.0")
            .text("altitude", "2100")
            .text("kind", "HIDROLOGICA")
            .text("device_id", "dev-1")
            .part("foto", Part::bytes(vec![1, 2, 3]).file_name("norte.png"));
        let response = gateway
            .http
            .post(gateway.url("/api/stations"))
            .bearer_auth(&token)
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let saved = gateway.repo.saved.lock().unwrap();
        let (kind, _, payload) = &saved[0];
        assert_eq!(*kind, EntityKind::Station);
        assert_eq!(payload.field("nombre"), Some("NORTE"));
        assert_eq!(payload.field("id_microcuenca"), Some("m1"));
        assert!(payload.photo.is_some());
    }

    #[tokio::test]
    async fn test_account_status_flips_when_unspecified() {
        let gateway = Gateway::start().await;
        *gateway.repo.administrators.lock().unwrap() =
            vec![administrator("u2", "Luis", "luis@unl.edu.ec")];
        let token = gateway.login().await;

        let response = gateway
            .http
            .post(gateway.url("/api/administrators/u2/status"))
            .bearer_auth(&token)
            .json(&json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            gateway.repo.status_changes.lock().unwrap().clone(),
            vec![("u2".to_string(), "DENEGADO".to_string())]
        );
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let gateway = Gateway::start().await;
        let token = gateway.login().await;

        let response = gateway
            .http
            .delete(gateway.url("/api/session"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = gateway
            .http
            .get(gateway.url("/api/session"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
