use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::air::{
    classify_aqi, classify_pollutant, AirQualityError, AirQualityProvider, AqiClassification,
    BoundingBox, PollutantStatus, StationDetail, StationSummary, WaqiProvider,
};
use crate::analysis::{analyze_tender, overview, TenderAnalysis, TenderOverview};
use crate::config::Config;
use crate::narrative::{Narrative, Narrator};
use crate::risk::RiskEngine;
use crate::tender::{Tender, TenderCatalog, TenderError};

#[derive(Clone)]
pub struct ApiState {
    config: Config,
    engine: RiskEngine,
    catalog: Arc<TenderCatalog>,
    narrator: Narrator,
    provider: Arc<dyn AirQualityProvider>,
}

impl ApiState {
    pub fn new(
        config: Config,
        catalog: TenderCatalog,
        narrator: Narrator,
        provider: Arc<dyn AirQualityProvider>,
    ) -> Self {
        Self {
            engine: RiskEngine::new(config.risk.clone()),
            config,
            catalog: Arc::new(catalog),
            narrator,
            provider,
        }
    }

    pub fn from_config(config: Config) -> Result<Self> {
        let catalog = TenderCatalog::resolve(config.resolved_dataset_path().as_deref())?;
        let narrator = Narrator::from_config(&config.ai).unwrap_or_else(|err| {
            warn!("AI client unavailable, narratives use local summaries: {err}");
            Narrator::local_only()
        });
        let provider = Arc::new(WaqiProvider::from_config(&config.air_quality));
        Ok(Self::new(config, catalog, narrator, provider))
    }
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn upstream(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: error.to_string(),
        }
    }

    fn internal(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

impl From<TenderError> for ApiError {
    fn from(error: TenderError) -> Self {
        match error {
            TenderError::NotFound(_) => Self::not_found(error.to_string()),
            TenderError::InvalidTender(_) => Self::bad_request(error.to_string()),
            TenderError::Dataset(_) | TenderError::Io { .. } => Self::internal(error),
        }
    }
}

impl From<AirQualityError> for ApiError {
    fn from(error: AirQualityError) -> Self {
        match error {
            AirQualityError::NotFound(_) => Self::not_found(error.to_string()),
            AirQualityError::Upstream(_) | AirQualityError::Transport(_) => {
                warn!("air-quality upstream failed: {error}");
                Self::upstream(error)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Clone, Default, Deserialize)]
struct AnalysisQuery {
    #[serde(default)]
    narrate: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ClassifyQuery {
    kind: String,
    value: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AqiQuery {
    value: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct StationsQuery {
    bbox: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    tenders: usize,
    ai_enabled: bool,
}

#[derive(Debug, Serialize)]
struct TendersResponse {
    tenders: Vec<TenderOverview>,
}

#[derive(Debug, Serialize)]
struct ClassifyResponse {
    kind: String,
    value: f64,
    status: PollutantStatus,
}

#[derive(Debug, Serialize)]
struct StationsResponse {
    bounds: BoundingBox,
    stations: Vec<StationSummary>,
}

#[derive(Debug, Serialize)]
struct StationResponse {
    station: StationDetail,
    classification: AqiClassification,
}

#[derive(Debug, Serialize)]
struct StationNarrativeResponse {
    station_id: String,
    narrative: Narrative,
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/config", get(show_config))
        .route("/v1/tenders", get(list_tenders))
        .route("/v1/tenders/analyze", post(analyze_body))
        .route("/v1/tenders/:id", get(show_tender))
        .route("/v1/tenders/:id/analysis", get(analyze_by_id))
        .route("/v1/classify", get(classify))
        .route("/v1/aqi", get(aqi))
        .route("/v1/stations", get(stations))
        .route("/v1/stations/:id", get(station))
        .route("/v1/stations/:id/narrative", get(station_narrative))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    let state = ApiState::from_config(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("REST API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health(State(state): State<ApiState>) -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse {
        status: "ok",
        tenders: state.catalog.len(),
        ai_enabled: state.narrator.has_backend(),
    })
}

async fn show_config(State(state): State<ApiState>) -> Json<ApiResponse<Config>> {
    ok(state.config)
}

async fn list_tenders(State(state): State<ApiState>) -> Json<ApiResponse<TendersResponse>> {
    let tenders = overview(&state.engine, &state.catalog, Utc::now());
    ok(TendersResponse { tenders })
}

async fn show_tender(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult<Tender> {
    let tender = state.catalog.get(&id)?;
    Ok(ok(tender.clone()))
}

async fn analyze_by_id(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    query: Result<Query<AnalysisQuery>, QueryRejection>,
) -> ApiResult<TenderAnalysis> {
    let Query(query) = query?;
    let tender = state.catalog.get(&id)?;
    let narrator = query.narrate.then_some(&state.narrator);
    let analysis = analyze_tender(&state.engine, narrator, tender, Utc::now()).await?;
    Ok(ok(analysis))
}

async fn analyze_body(
    State(state): State<ApiState>,
    query: Result<Query<AnalysisQuery>, QueryRejection>,
    body: Result<Json<Tender>, JsonRejection>,
) -> ApiResult<TenderAnalysis> {
    let Query(query) = query?;
    let Json(tender) = body?;
    let narrator = query.narrate.then_some(&state.narrator);
    let analysis = analyze_tender(&state.engine, narrator, &tender, Utc::now()).await?;
    Ok(ok(analysis))
}

async fn classify(
    query: Result<Query<ClassifyQuery>, QueryRejection>,
) -> ApiResult<ClassifyResponse> {
    let Query(query) = query?;
    let status = classify_pollutant(&query.kind, query.value);
    Ok(ok(ClassifyResponse {
        kind: query.kind,
        value: query.value,
        status,
    }))
}

async fn aqi(query: Result<Query<AqiQuery>, QueryRejection>) -> ApiResult<AqiClassification> {
    let Query(query) = query?;
    Ok(ok(classify_aqi(query.value)))
}

async fn stations(
    State(state): State<ApiState>,
    query: Result<Query<StationsQuery>, QueryRejection>,
) -> ApiResult<StationsResponse> {
    let Query(query) = query?;
    let bounds = match query.bbox.as_deref() {
        Some(raw) => raw
            .parse::<BoundingBox>()
            .map_err(|e| ApiError::bad_request(e.to_string()))?,
        None => state.config.air_quality.bounds,
    };
    let stations = state.provider.stations(&bounds).await?;
    Ok(ok(StationsResponse { bounds, stations }))
}

async fn station(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<StationResponse> {
    let station = state.provider.station(&id).await?;
    Ok(ok(StationResponse {
        classification: station.classification(),
        station,
    }))
}

async fn station_narrative(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<StationNarrativeResponse> {
    let station = state.provider.station(&id).await?;
    let narrative = state.narrator.narrate_air(&station).await;
    Ok(ok(StationNarrativeResponse {
        station_id: station.id,
        narrative,
    }))
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{build_router, ApiState};
    use crate::air::{
        AirQualityError, AirQualityProvider, BoundingBox, Measurement, PollutantKind,
        StationDetail, StationSummary,
    };
    use crate::config::Config;
    use crate::narrative::Narrator;
    use crate::tender::TenderCatalog;

    struct StubProvider;

    #[async_trait]
    impl AirQualityProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn stations(
            &self,
            _bounds: &BoundingBox,
        ) -> Result<Vec<StationSummary>, AirQualityError> {
            Ok(vec![StationSummary {
                id: "42".to_string(),
                name: "Medeu".to_string(),
                latitude: 43.15,
                longitude: 77.05,
                aqi: Some(57.0),
                updated_at: None,
            }])
        }

        async fn station(&self, id: &str) -> Result<StationDetail, AirQualityError> {
            if id != "42" {
                return Err(AirQualityError::NotFound(id.to_string()));
            }
            Ok(StationDetail {
                id: "42".to_string(),
                name: "Medeu".to_string(),
                aqi: Some(57.0),
                updated_at: None,
                measurements: vec![Measurement::new(PollutantKind::Pm25, 22.0, None)],
            })
        }
    }

    fn state() -> ApiState {
        ApiState::new(
            Config::default(),
            TenderCatalog::builtin().expect("builtin dataset"),
            Narrator::local_only(),
            Arc::new(StubProvider),
        )
    }

    async fn call(request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(state())
            .oneshot(request)
            .await
            .expect("router responds");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let body = serde_json::from_slice(&bytes).expect("json body");
        (status, body)
    }

    async fn get(uri: &str) -> (StatusCode, Value) {
        call(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
    }

    #[tokio::test]
    async fn health_reports_catalog_size() {
        let (status, body) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["data"]["tenders"], 5);
        assert_eq!(body["data"]["ai_enabled"], false);
    }

    #[tokio::test]
    async fn unknown_tender_is_not_found() {
        let (status, body) = get("/v1/tenders/T-404").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["ok"], false);
        assert!(body["error"].as_str().unwrap_or_default().contains("T-404"));

        let (status, _) = get("/v1/tenders/T-404/analysis").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn analysis_with_narration_uses_local_summary() {
        let (status, body) = get("/v1/tenders/T-2025-001/analysis?narrate=true").await;
        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["tender"]["id"], "T-2025-001");
        assert_eq!(data["narrative"]["source"], "local");
        assert_eq!(data["narrative"]["text"], data["assessment"]["summary"]);
    }

    #[tokio::test]
    async fn analysis_without_narration_omits_text() {
        let (status, body) = get("/v1/tenders/T-2025-003/analysis").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["narrative"].is_null());
    }

    #[tokio::test]
    async fn posted_tender_with_inverted_window_is_rejected() {
        let payload = json!({
            "id": "T-ADHOC",
            "title": "Road repair",
            "category": "construction",
            "amount": 1_000_000_000u64,
            "execution_start": "2025-09-01T00:00:00Z",
            "execution_end": "2025-06-01T00:00:00Z",
            "deadline": "2025-05-01T00:00:00Z"
        });
        let (status, body) = call(
            Request::builder()
                .method("POST")
                .uri("/v1/tenders/analyze")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request builds"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn posted_tender_is_scored() {
        let payload = json!({
            "id": "T-ADHOC",
            "title": "Clinic equipment",
            "category": "medical",
            "amount": 600_000_000u64,
            "execution_start": "2030-04-01T00:00:00Z",
            "execution_end": "2030-07-31T00:00:00Z",
            "deadline": "2030-03-15T00:00:00Z"
        });
        let (status, body) = call(
            Request::builder()
                .method("POST")
                .uri("/v1/tenders/analyze")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request builds"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["assessment"]["risk_score"], 0);
        assert_eq!(body["data"]["assessment"]["risk_level"], "low");
        assert_eq!(
            body["data"]["assessment"]["warnings"][0]["type"],
            "category"
        );
    }

    async fn post_raw(body: &str) -> (StatusCode, Value) {
        call(
            Request::builder()
                .method("POST")
                .uri("/v1/tenders/analyze")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request builds"),
        )
        .await
    }

    #[tokio::test]
    async fn malformed_input_is_reported_in_the_error_envelope() {
        let (status, body) = post_raw("{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert!(body["error"].is_string());

        let negative = json!({
            "id": "T-ADHOC",
            "title": "Road repair",
            "category": "construction",
            "amount": -5,
            "execution_start": "2025-06-01T00:00:00Z",
            "execution_end": "2025-09-01T00:00:00Z",
            "deadline": "2025-05-01T00:00:00Z"
        });
        let (status, body) = post_raw(&negative.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);

        let (status, body) = get("/v1/classify?kind=pm25&value=lots").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);

        let (status, body) = get("/v1/classify?kind=pm25&value=NaN").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "unknown");
    }

    #[tokio::test]
    async fn classify_endpoints_follow_thresholds() {
        let (_, body) = get("/v1/classify?kind=pm2.5&value=35").await;
        assert_eq!(body["data"]["status"], "moderate");
        let (_, body) = get("/v1/classify?kind=ozone&value=1").await;
        assert_eq!(body["data"]["status"], "unknown");
        let (_, body) = get("/v1/aqi?value=151").await;
        assert_eq!(body["data"]["status"], "unhealthy");
        let (_, body) = get("/v1/aqi").await;
        assert_eq!(body["data"]["label"], "No data");
    }

    #[tokio::test]
    async fn stations_reject_inverted_bbox_and_map_not_found() {
        let (status, body) = get("/v1/stations").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["stations"][0]["id"], "42");
        assert_eq!(
            body["data"]["stations"][0]["classification"]["status"],
            "moderate"
        );

        let (status, _) = get("/v1/stations?bbox=44,76,43,77").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get("/v1/stations/7").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = get("/v1/stations/42/narrative").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["narrative"]["source"], "local");
    }
}
