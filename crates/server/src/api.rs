//! JSON routes over the configurator engine.
//!
//! Every request carries a correlation id: the caller's `x-correlation-id`
//! header when present, a fresh UUID otherwise. It is echoed on the response
//! and embedded in every error body.

use std::convert::Infallible;
use std::time::Instant;

use axum::{
    extract::{FromRequestParts, Path, Query, Request, State},
    http::{request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bespoke_core::domain::bom::Bom;
use bespoke_core::domain::configuration::{ConfigurationId, ConfigurationStatus};
use bespoke_core::domain::history::HistoryEntry;
use bespoke_core::domain::product::ProductTypeProfile;
use bespoke_core::domain::selection::Selections;
use bespoke_core::domain::validation::ValidationResult;
use bespoke_core::errors::{ApplicationError, InterfaceError};
use bespoke_db::repositories::{ConfigurationFilter, SortDirection};
use bespoke_engine::{
    ConfigurationListPage, ConfigurationView, ConfiguratorEngine, CreateConfiguration,
    ProductParametersView, UpdateConfiguration, UpdateOutcome,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const CORRELATION_HEADER: &str = "x-correlation-id";
pub const PERFORMED_BY_HEADER: &str = "x-performed-by";

#[derive(Clone)]
pub struct ApiState {
    engine: ConfiguratorEngine,
}

pub fn router(engine: ConfiguratorEngine) -> Router {
    Router::new()
        .route("/api/product-types", get(list_product_types))
        .route("/api/product-types/{code}/parameters", get(product_type_parameters))
        .route("/api/catalog/invalidate", post(invalidate_catalog))
        .route("/api/configurations", post(create_configuration).get(list_configurations))
        .route(
            "/api/configurations/{id}",
            get(get_configuration).patch(update_configuration).delete(delete_configuration),
        )
        .route("/api/configurations/{id}/validate", post(validate_configuration))
        .route("/api/configurations/{id}/finalize", post(finalize_configuration))
        .route("/api/configurations/{id}/clone", post(clone_configuration))
        .route("/api/configurations/{id}/history", get(configuration_history))
        .route("/api/configurations/{id}/parameters", get(configuration_parameters))
        .route("/api/configurations/{id}/bom", post(generate_bom).get(current_bom))
        .with_state(ApiState { engine })
        .layer(middleware::from_fn(track_request))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    fn from_headers(headers: &HeaderMap) -> Self {
        let supplied = headers
            .get(CORRELATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        Self(supplied.map_or_else(|| Uuid::new_v4().to_string(), str::to_owned))
    }
}

impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CorrelationId>()
            .cloned()
            .unwrap_or_else(|| CorrelationId::from_headers(&parts.headers)))
    }
}

async fn track_request(mut request: Request, next: Next) -> Response {
    let correlation = CorrelationId::from_headers(request.headers());
    request.extensions_mut().insert(correlation.clone());
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&correlation.0) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    info!(
        event_name = "http.request.completed",
        correlation_id = %correlation.0,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request handled"
    );
    response
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub correlation_id: String,
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl ApiError {
    fn new(source: ApplicationError, correlation: &CorrelationId) -> Self {
        let cause = source.to_string();
        let mapped = source.into_interface(correlation.0.clone());
        match &mapped {
            InterfaceError::ServiceUnavailable { .. } | InterfaceError::Internal { .. } => error!(
                event_name = "http.request.failed",
                correlation_id = %correlation.0,
                error = %mapped,
                cause = %cause,
                "request failed"
            ),
            _ => warn!(
                event_name = "http.request.rejected",
                correlation_id = %correlation.0,
                error = %mapped,
                cause = %cause,
                "request rejected"
            ),
        }
        Self(mapped)
    }

    fn invalid(message: impl Into<String>, correlation: &CorrelationId) -> Self {
        Self::new(ApplicationError::ValidationFailed(vec![message.into()]), correlation)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, expose_detail) = match &self.0 {
            InterfaceError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "bad_request", true),
            InterfaceError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found", true),
            InterfaceError::Conflict { .. } => (StatusCode::CONFLICT, "conflict", true),
            InterfaceError::BadGateway { .. } => (StatusCode::BAD_GATEWAY, "bad_gateway", true),
            InterfaceError::ServiceUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", false)
            }
            InterfaceError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal", false),
        };
        let correlation_id = match &self.0 {
            InterfaceError::BadRequest { correlation_id, .. }
            | InterfaceError::NotFound { correlation_id, .. }
            | InterfaceError::Conflict { correlation_id, .. }
            | InterfaceError::BadGateway { correlation_id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id, .. }
            | InterfaceError::Internal { correlation_id, .. } => correlation_id.clone(),
        };

        let body = ErrorBody {
            error: kind,
            message: self.0.user_message(),
            detail: expose_detail.then(|| self.0.message().to_owned()),
            correlation_id,
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn performed_by(headers: &HeaderMap) -> Option<String> {
    headers
        .get(PERFORMED_BY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<String>,
    pub product_type_code: Option<String>,
    pub family_code: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_direction: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> Result<ConfigurationFilter, ApplicationError> {
        let defaults = ConfigurationFilter::default();
        let status = self.status.as_deref().map(str::parse::<ConfigurationStatus>).transpose()?;
        let direction = match self.sort_direction.as_deref() {
            None => defaults.direction,
            Some(raw) => SortDirection::parse(raw).ok_or_else(|| {
                ApplicationError::ValidationFailed(vec![format!(
                    "sortDirection must be asc or desc, got `{raw}`"
                )])
            })?,
        };

        Ok(ConfigurationFilter {
            status,
            product_type_code: self.product_type_code,
            family_code: self.family_code,
            page: self.page.unwrap_or(defaults.page),
            page_size: self.page_size.unwrap_or(defaults.page_size),
            direction,
        })
    }
}

async fn list_product_types(
    State(state): State<ApiState>,
    correlation: CorrelationId,
) -> ApiResult<Json<Vec<ProductTypeProfile>>> {
    let profiles = state
        .engine
        .configurations
        .product_types()
        .await
        .map_err(|error| ApiError::new(error, &correlation))?;
    Ok(Json(profiles))
}

async fn product_type_parameters(
    State(state): State<ApiState>,
    correlation: CorrelationId,
    Path(code): Path<String>,
) -> ApiResult<Json<ProductParametersView>> {
    let view = state
        .engine
        .configurations
        .product_parameters(&code, &Selections::new())
        .await
        .map_err(|error| ApiError::new(error, &correlation))?;
    Ok(Json(view))
}

async fn invalidate_catalog(State(state): State<ApiState>) -> StatusCode {
    state.engine.spec_context.invalidate().await;
    StatusCode::NO_CONTENT
}

async fn create_configuration(
    State(state): State<ApiState>,
    correlation: CorrelationId,
    Json(request): Json<CreateConfiguration>,
) -> ApiResult<(StatusCode, Json<ConfigurationView>)> {
    if request.product_type_code.trim().is_empty() {
        return Err(ApiError::invalid("productTypeCode is required", &correlation));
    }
    let created = state
        .engine
        .configurations
        .create(request)
        .await
        .map_err(|error| ApiError::new(error, &correlation))?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_configurations(
    State(state): State<ApiState>,
    correlation: CorrelationId,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ConfigurationListPage>> {
    let filter = query.into_filter().map_err(|error| ApiError::new(error, &correlation))?;
    let page = state
        .engine
        .configurations
        .list(&filter)
        .await
        .map_err(|error| ApiError::new(error, &correlation))?;
    Ok(Json(page))
}

async fn get_configuration(
    State(state): State<ApiState>,
    correlation: CorrelationId,
    Path(id): Path<String>,
) -> ApiResult<Json<ConfigurationView>> {
    let view = state
        .engine
        .configurations
        .get(&ConfigurationId(id))
        .await
        .map_err(|error| ApiError::new(error, &correlation))?;
    Ok(Json(view))
}

async fn update_configuration(
    State(state): State<ApiState>,
    correlation: CorrelationId,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(mut request): Json<UpdateConfiguration>,
) -> ApiResult<Json<UpdateOutcome>> {
    if request.performed_by.is_none() {
        request.performed_by = performed_by(&headers);
    }
    let outcome = state
        .engine
        .configurations
        .update(&ConfigurationId(id), request)
        .await
        .map_err(|error| ApiError::new(error, &correlation))?;
    Ok(Json(outcome))
}

async fn delete_configuration(
    State(state): State<ApiState>,
    correlation: CorrelationId,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .engine
        .configurations
        .delete(&ConfigurationId(id))
        .await
        .map_err(|error| ApiError::new(error, &correlation))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn validate_configuration(
    State(state): State<ApiState>,
    correlation: CorrelationId,
    Path(id): Path<String>,
) -> ApiResult<Json<ValidationResult>> {
    let result = state
        .engine
        .configurations
        .validate(&ConfigurationId(id))
        .await
        .map_err(|error| ApiError::new(error, &correlation))?;
    Ok(Json(result))
}

async fn finalize_configuration(
    State(state): State<ApiState>,
    correlation: CorrelationId,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<ConfigurationView>> {
    let view = state
        .engine
        .configurations
        .finalize(&ConfigurationId(id), performed_by(&headers))
        .await
        .map_err(|error| ApiError::new(error, &correlation))?;
    Ok(Json(view))
}

async fn clone_configuration(
    State(state): State<ApiState>,
    correlation: CorrelationId,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<(StatusCode, Json<ConfigurationView>)> {
    let cloned = state
        .engine
        .configurations
        .clone_configuration(&ConfigurationId(id), performed_by(&headers))
        .await
        .map_err(|error| ApiError::new(error, &correlation))?;
    Ok((StatusCode::CREATED, Json(cloned)))
}

async fn configuration_history(
    State(state): State<ApiState>,
    correlation: CorrelationId,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    let entries = state
        .engine
        .configurations
        .history(&ConfigurationId(id))
        .await
        .map_err(|error| ApiError::new(error, &correlation))?;
    Ok(Json(entries))
}

async fn configuration_parameters(
    State(state): State<ApiState>,
    correlation: CorrelationId,
    Path(id): Path<String>,
) -> ApiResult<Json<ProductParametersView>> {
    let view = state
        .engine
        .configurations
        .configuration_parameters(&ConfigurationId(id))
        .await
        .map_err(|error| ApiError::new(error, &correlation))?;
    Ok(Json(view))
}

async fn generate_bom(
    State(state): State<ApiState>,
    correlation: CorrelationId,
    Path(id): Path<String>,
) -> ApiResult<Json<Bom>> {
    let bom = state
        .engine
        .boms
        .generate(&ConfigurationId(id))
        .await
        .map_err(|error| ApiError::new(error, &correlation))?;
    Ok(Json(bom))
}

async fn current_bom(
    State(state): State<ApiState>,
    correlation: CorrelationId,
    Path(id): Path<String>,
) -> ApiResult<Json<Bom>> {
    let bom = state
        .engine
        .boms
        .current_bom(&ConfigurationId(id))
        .await
        .map_err(|error| ApiError::new(error, &correlation))?;
    Ok(Json(bom))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
        Router,
    };
    use bespoke_core::domain::validation::{ValidationIssue, ValidationResult};
    use bespoke_core::rules::{DecisionKind, GatewayError};
    use bespoke_engine::testing::Harness;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{router, CORRELATION_HEADER, PERFORMED_BY_HEADER};

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = app.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let correlation = response
            .headers()
            .get(CORRELATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, correlation, body)
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn empty_request(method: Method, uri: &str) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(Body::empty()).expect("request")
    }

    async fn create(app: &Router) -> String {
        let (status, _, body) = send(
            app,
            json_request(
                Method::POST,
                "/api/configurations",
                json!({"productTypeCode": "RS-STD", "reference": "Living room"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().expect("id").to_owned()
    }

    #[tokio::test]
    async fn create_then_get_round_trips_through_the_router() {
        let harness = Harness::demo();
        let app = router(harness.engine.clone());
        let id = create(&app).await;

        let (status, correlation, body) =
            send(&app, empty_request(Method::GET, &format!("/api/configurations/{id}"))).await;

        assert_eq!(status, StatusCode::OK);
        assert!(correlation.is_some(), "a correlation id is generated when none is supplied");
        assert_eq!(body["status"], json!("draft"));
        assert_eq!(body["version"], json!(1));
        assert_eq!(body["reference"], json!("Living room"));
        assert_eq!(body["isComplete"], json!(false));
    }

    #[tokio::test]
    async fn supplied_correlation_id_is_echoed_in_header_and_error_body() {
        let harness = Harness::demo();
        let app = router(harness.engine.clone());

        let request = Request::builder()
            .uri("/api/configurations/missing")
            .header(CORRELATION_HEADER, "req-42")
            .body(Body::empty())
            .expect("request");
        let (status, correlation, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(correlation.as_deref(), Some("req-42"));
        assert_eq!(body["error"], json!("not_found"));
        assert_eq!(body["correlationId"], json!("req-42"));
        assert!(body["detail"].as_str().expect("detail").contains("missing"));
    }

    #[tokio::test]
    async fn stale_update_is_a_conflict() {
        let harness = Harness::demo();
        let app = router(harness.engine.clone());
        let id = create(&app).await;
        let uri = format!("/api/configurations/{id}");

        let (status, _, body) = send(
            &app,
            json_request(
                Method::PATCH,
                &uri,
                json!({"selections": {"widthMm": 1800}, "expectedVersion": 1}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], json!(2));
        assert_eq!(body["status"], json!("valid"));
        assert_eq!(body["changedFields"], json!(["widthMm"]));

        let (status, _, body) = send(
            &app,
            json_request(
                Method::PATCH,
                &uri,
                json!({"selections": {"widthMm": 2000}, "expectedVersion": 1}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], json!("conflict"));
    }

    #[tokio::test]
    async fn structural_errors_are_bad_requests_without_gateway_calls() {
        let harness = Harness::demo();
        let app = router(harness.engine.clone());
        let id = create(&app).await;

        let (status, _, body) = send(
            &app,
            json_request(
                Method::PATCH,
                &format!("/api/configurations/{id}"),
                json!({"selections": {"widthMm": "wide"}, "expectedVersion": 1}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("bad_request"));
        assert!(harness.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn finalize_with_outstanding_errors_is_rejected() {
        let harness = Harness::demo();
        let app = router(harness.engine.clone());
        let id = create(&app).await;
        harness.gateway.set_validation(ValidationResult::failed(vec![ValidationIssue::new(
            "widthMm",
            "pvc_max_width",
            "PVC profiles cap out at 2500mm",
        )]));

        let (status, _, body) = send(
            &app,
            empty_request(Method::POST, &format!("/api/configurations/{id}/finalize")),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().expect("detail").contains("1 error"));
    }

    #[tokio::test]
    async fn finalize_records_the_acting_user() {
        let harness = Harness::demo();
        let app = router(harness.engine.clone());
        let id = create(&app).await;

        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/configurations/{id}/finalize"))
            .header(PERFORMED_BY_HEADER, "planner@example.com")
            .body(Body::empty())
            .expect("request");
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("finalized"));
        assert_eq!(body["canFinalize"], json!(false));

        let (_, _, history) =
            send(&app, empty_request(Method::GET, &format!("/api/configurations/{id}/history")))
                .await;
        let entries = history.as_array().expect("history array");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["action"], json!("finalized"));
        assert_eq!(entries[1]["performed_by"], json!("planner@example.com"));

        let (status, _, _) =
            send(&app, empty_request(Method::DELETE, &format!("/api/configurations/{id}"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn gateway_outage_on_validate_is_a_bad_gateway() {
        let harness = Harness::demo();
        let app = router(harness.engine.clone());
        let id = create(&app).await;
        harness.gateway.fail(DecisionKind::Validate);

        let (status, _, body) = send(
            &app,
            empty_request(Method::POST, &format!("/api/configurations/{id}/validate")),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], json!("bad_gateway"));
    }

    #[tokio::test]
    async fn bad_gateway_detail_omits_the_upstream_body() {
        let harness = Harness::demo();
        let app = router(harness.engine.clone());
        let id = create(&app).await;
        harness.gateway.fail_with(
            DecisionKind::Validate,
            GatewayError::Status {
                decision_path: "roller-shutter/validate".to_owned(),
                status: 500,
                body: "stack trace: db password=hunter2".to_owned(),
            },
        );

        let (status, _, body) = send(
            &app,
            empty_request(Method::POST, &format!("/api/configurations/{id}/validate")),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let detail = body["detail"].as_str().unwrap_or_default();
        assert_eq!(detail, "rules engine returned HTTP 500 for `roller-shutter/validate`");
        assert!(!body.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn list_rejects_out_of_range_page_size_and_unknown_sort() {
        let harness = Harness::demo();
        let app = router(harness.engine.clone());
        create(&app).await;
        create(&app).await;

        let (status, _, body) =
            send(&app, empty_request(Method::GET, "/api/configurations?pageSize=1&page=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalCount"], json!(2));
        assert_eq!(body["items"].as_array().expect("items").len(), 1);

        let (status, _, _) =
            send(&app, empty_request(Method::GET, "/api/configurations?pageSize=101")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) =
            send(&app, empty_request(Method::GET, "/api/configurations?sortDirection=sideways"))
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) =
            send(&app, empty_request(Method::GET, "/api/configurations?status=shipped")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn clone_and_delete_follow_the_lifecycle() {
        let harness = Harness::demo();
        let app = router(harness.engine.clone());
        let id = create(&app).await;

        let (status, _, cloned) =
            send(&app, empty_request(Method::POST, &format!("/api/configurations/{id}/clone")))
                .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(cloned["reference"], json!("Living room (copy)"));
        assert_ne!(cloned["id"], json!(id));

        let (status, _, body) =
            send(&app, empty_request(Method::DELETE, &format!("/api/configurations/{id}"))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, _, _) =
            send(&app, empty_request(Method::GET, &format!("/api/configurations/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bom_generation_and_current_bom() {
        let harness = Harness::demo();
        let app = router(harness.engine.clone());
        let id = create(&app).await;
        harness.gateway.set_bom_document(json!({"result": {"lines": [
            {"sku": "RS-BRACKET", "quantity": 2, "sortOrder": 1}
        ]}}));

        let (status, _, generated) =
            send(&app, empty_request(Method::POST, &format!("/api/configurations/{id}/bom")))
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(generated["lines"].as_array().expect("lines").len(), 1);
        assert!(generated["generatedAt"].is_string());

        let (status, _, current) =
            send(&app, empty_request(Method::GET, &format!("/api/configurations/{id}/bom"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(current["lines"], generated["lines"]);
        assert_eq!(current["generatedAt"], Value::Null);
    }

    #[tokio::test]
    async fn product_type_parameters_are_grouped_into_steps() {
        let harness = Harness::demo();
        let app = router(harness.engine.clone());

        let (status, _, types) = send(&app, empty_request(Method::GET, "/api/product-types")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!types.as_array().expect("types").is_empty());

        let (status, _, view) =
            send(&app, empty_request(Method::GET, "/api/product-types/RS-STD/parameters")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["productTypeCode"], json!("RS-STD"));
        assert_eq!(view["steps"][0]["stepNumber"], json!(1));

        let (status, _, _) =
            send(&app, empty_request(Method::GET, "/api/product-types/NOPE/parameters")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn catalog_invalidation_forces_a_reload() {
        let harness = Harness::demo();
        let app = router(harness.engine.clone());
        harness.engine.spec_context.global_catalog().await.expect("warm cache");
        let reads = harness.catalog.catalog_reads();

        let (status, _, _) =
            send(&app, empty_request(Method::POST, "/api/catalog/invalidate")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        harness.engine.spec_context.global_catalog().await.expect("reload");
        assert_eq!(harness.catalog.catalog_reads(), reads + 1);
    }
}
