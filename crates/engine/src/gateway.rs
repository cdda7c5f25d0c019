//! HTTP client for the external decision engine.
//!
//! Each decision is a `POST {base_url}/api/projects/{slug}/evaluate/{path}.json`
//! with a `{"context": …}` body. Responses are decoded by
//! [`bespoke_core::rules::payload`]; no retries are attempted here.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, warn};

use bespoke_core::config::RulesEngineConfig;
use bespoke_core::domain::validation::ValidationResult;
use bespoke_core::errors::ApplicationError;
use bespoke_core::rules::payload::{parse_bom, parse_options, parse_validation};
use bespoke_core::rules::{
    BomDecision, GatewayError, OptionsDecision, RuleContext, RuleEvaluationGateway,
};

pub struct HttpRuleGateway {
    client: Client,
    base_url: String,
    project_slug: String,
    api_key: Option<SecretString>,
}

impl HttpRuleGateway {
    pub fn from_config(config: &RulesEngineConfig) -> Result<Self, ApplicationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| {
                ApplicationError::Configuration(format!("rules engine client: {error}"))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            project_slug: config.project_slug.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self, decision_path: &str) -> String {
        let path = decision_path.trim_start_matches('/');
        let suffix = if path.ends_with(".json") { "" } else { ".json" };
        format!("{}/api/projects/{}/evaluate/{path}{suffix}", self.base_url, self.project_slug)
    }

    /// Raw decision document. Non-success statuses carry the response body.
    pub async fn evaluate(
        &self,
        decision_path: &str,
        context: &RuleContext,
    ) -> Result<Value, GatewayError> {
        let url = self.endpoint(decision_path);
        let started = Instant::now();

        let mut request = self.client.post(&url).json(&json!({ "context": context }));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|error| {
            warn!(
                event_name = "rules.request.failed",
                decision_path,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %error,
                "rules engine request failed"
            );
            GatewayError::Transport {
                decision_path: decision_path.to_owned(),
                message: error.to_string(),
            }
        })?;

        let status = response.status();
        debug!(
            event_name = "rules.request.completed",
            decision_path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "rules engine responded"
        );

        let body = response.text().await.map_err(|error| GatewayError::Transport {
            decision_path: decision_path.to_owned(),
            message: error.to_string(),
        })?;

        if !status.is_success() {
            warn!(
                event_name = "rules.request.rejected",
                decision_path,
                status = status.as_u16(),
                body = %body,
                "rules engine returned an error status"
            );
            return Err(GatewayError::Status {
                decision_path: decision_path.to_owned(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|error| GatewayError::Decode {
            decision_path: decision_path.to_owned(),
            message: error.to_string(),
        })
    }
}

fn decode_error(decision_path: &str, message: String) -> GatewayError {
    GatewayError::Decode { decision_path: decision_path.to_owned(), message }
}

#[async_trait]
impl RuleEvaluationGateway for HttpRuleGateway {
    async fn validate(
        &self,
        decision_path: &str,
        context: &RuleContext,
    ) -> Result<ValidationResult, GatewayError> {
        let document = self.evaluate(decision_path, context).await?;
        Ok(parse_validation(&document))
    }

    async fn options(
        &self,
        decision_path: &str,
        context: &RuleContext,
    ) -> Result<OptionsDecision, GatewayError> {
        let document = self.evaluate(decision_path, context).await?;
        parse_options(&document).map_err(|message| decode_error(decision_path, message))
    }

    async fn bom(
        &self,
        decision_path: &str,
        context: &RuleContext,
    ) -> Result<BomDecision, GatewayError> {
        let document = self.evaluate(decision_path, context).await?;
        let lines = parse_bom(&document).map_err(|message| decode_error(decision_path, message))?;
        Ok(BomDecision { lines, payload: document })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use secrecy::SecretString;
    use serde_json::{json, Value};

    use bespoke_core::config::RulesEngineConfig;
    use bespoke_core::rules::{
        GatewayError, ProductTypeIdentity, RuleContext, RuleEvaluationGateway,
    };

    use super::HttpRuleGateway;

    #[derive(Clone, Default)]
    struct Recorded {
        requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
    }

    async fn evaluate(
        State(recorded): State<Recorded>,
        Path((project, path)): Path<(String, String)>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let authorization = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        recorded
            .requests
            .lock()
            .expect("record lock")
            .push((format!("{project}/{path}"), authorization, body));

        match path.as_str() {
            "roller-shutter/validate.json" => (
                StatusCode::OK,
                Json(json!({"result": {"valid": false, "errors": [
                    {"parameter": "widthMm", "rule": "pvc_max_width", "message": "PVC profiles cap out at 2500mm"}
                ]}})),
            ),
            "roller-shutter/options.json" => (
                StatusCode::OK,
                Json(json!({"result": {"availableOptions": {}, "resetFields": ["motorType"]}})),
            ),
            "roller-shutter/bom.json" => (
                StatusCode::OK,
                Json(json!({"result": {"lines": [{"sku": "RS-BRACKET", "quantity": 3}]}})),
            ),
            "broken/options.json" => {
                (StatusCode::OK, Json(json!({"result": {"resetFields": [1, 2]}})))
            }
            _ => (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"error": "unknown decision"}))),
        }
    }

    async fn start_engine() -> (String, Recorded) {
        let recorded = Recorded::default();
        let app = Router::new()
            .route("/api/projects/{project}/evaluate/{*path}", post(evaluate))
            .with_state(recorded.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
        let address = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve rules engine stub");
        });
        (format!("http://{address}/"), recorded)
    }

    fn config(base_url: String, api_key: Option<&str>) -> RulesEngineConfig {
        RulesEngineConfig {
            base_url,
            project_slug: "configurator".to_owned(),
            timeout_secs: 5,
            api_key: api_key.map(|key| SecretString::from(key.to_owned())),
        }
    }

    fn context() -> RuleContext {
        RuleContext {
            user_selections: BTreeMap::new(),
            specs: json!({}),
            product_type: ProductTypeIdentity {
                code: "RS-STD".to_owned(),
                variant: "standard".to_owned(),
                family: "RS".to_owned(),
            },
        }
    }

    #[test]
    fn endpoint_appends_json_suffix_once() {
        let gateway = HttpRuleGateway::from_config(&config("http://rules.local/".to_owned(), None))
            .expect("gateway");

        assert_eq!(
            gateway.endpoint("roller-shutter/validate"),
            "http://rules.local/api/projects/configurator/evaluate/roller-shutter/validate.json"
        );
        assert_eq!(
            gateway.endpoint("roller-shutter/bom.json"),
            "http://rules.local/api/projects/configurator/evaluate/roller-shutter/bom.json"
        );
    }

    #[tokio::test]
    async fn decisions_are_posted_with_context_and_bearer_token() {
        let (base_url, recorded) = start_engine().await;
        let gateway =
            HttpRuleGateway::from_config(&config(base_url, Some("rules-token"))).expect("gateway");

        let validation =
            gateway.validate("roller-shutter/validate", &context()).await.expect("validate");
        assert!(!validation.valid);
        assert_eq!(validation.errors[0].rule, "pvc_max_width");

        let options = gateway.options("roller-shutter/options", &context()).await.expect("options");
        assert_eq!(options.reset_fields, vec!["motorType"]);

        let bom = gateway.bom("roller-shutter/bom", &context()).await.expect("bom");
        assert_eq!(bom.lines.len(), 1);
        assert_eq!(bom.payload["result"]["lines"][0]["sku"], json!("RS-BRACKET"));

        let requests = recorded.requests.lock().expect("record lock");
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].0, "configurator/roller-shutter/validate.json");
        assert_eq!(requests[0].1.as_deref(), Some("Bearer rules-token"));
        assert_eq!(requests[0].2["context"]["productType"]["code"], json!("RS-STD"));
    }

    #[tokio::test]
    async fn error_status_keeps_the_response_body() {
        let (base_url, _) = start_engine().await;
        let gateway = HttpRuleGateway::from_config(&config(base_url, None)).expect("gateway");

        let error = gateway.validate("screens/validate", &context()).await.expect_err("status");
        match error {
            GatewayError::Status { decision_path, status, body } => {
                assert_eq!(decision_path, "screens/validate");
                assert_eq!(status, 422);
                assert!(body.contains("unknown decision"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreadable_options_are_a_decode_error() {
        let (base_url, _) = start_engine().await;
        let gateway = HttpRuleGateway::from_config(&config(base_url, None)).expect("gateway");

        let error = gateway.options("broken/options", &context()).await.expect_err("decode");
        assert!(matches!(error, GatewayError::Decode { .. }));
    }

    #[tokio::test]
    async fn unreachable_engine_is_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        drop(listener);

        let gateway = HttpRuleGateway::from_config(&config(format!("http://{address}"), None))
            .expect("gateway");
        let error = gateway.validate("roller-shutter/validate", &context()).await.expect_err("down");
        assert!(matches!(error, GatewayError::Transport { .. }));
    }
}
