//! Tour Schedules Lambda - Proxies the RocketRez tour schedule API.
//!
//! Endpoints:
//! - GET /?siteId=2&date=YYYY-MM-DD&username=..&password=.. - Upcoming public tours
//! - OPTIONS - CORS preflight
//!
//! The caller's credentials are forwarded upstream as Basic auth; nothing is
//! cached or stored between invocations.

use chrono::{SecondsFormat, Utc};
use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use serde_json::Value;
use shared::http::{empty_response, json_response};
use shared::{
    normalize_schedules, Config, DebugInfo, ProxyErrorBody, RocketRezClient, ScheduleQuery,
    ScheduleResponse, UpstreamErrorBody, UsageError,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const SOURCE: &str = "RocketRez API";
const USAGE: &str = "?siteId=2&date=YYYY-MM-DD&username=YOUR_USERNAME&password=YOUR_PASSWORD";

/// Application state
struct AppState {
    config: Config,
    client: RocketRezClient,
}

impl AppState {
    fn new(config: Config) -> Self {
        let client = RocketRezClient::new(&config);
        Self { config, client }
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build the upstream query from the request, applying defaults.
fn schedule_query(event: &Request, config: &Config) -> shared::Result<ScheduleQuery> {
    let params = event.query_string_parameters();
    let param = |name: &str| params.first(name).filter(|v| !v.is_empty()).map(str::to_string);

    let (username, password) = match (param("username"), param("password")) {
        (Some(username), Some(password)) => (username, password),
        _ => return Err(shared::Error::MissingCredentials),
    };

    Ok(ScheduleQuery {
        site_id: param("siteId").unwrap_or_else(|| config.default_site_id.clone()),
        date: param("date").unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string()),
        username,
        password,
    })
}

fn error_response(err: shared::Error) -> Result<Response<Body>, Error> {
    let status = err.status_code();
    let message = err.to_string();
    match err {
        shared::Error::MissingCredentials => json_response(
            status,
            &UsageError {
                error: message,
                usage: USAGE,
            },
        ),
        shared::Error::MethodNotAllowed(_) => {
            json_response(status, &serde_json::json!({ "error": "Method not allowed" }))
        }
        shared::Error::Upstream {
            status_text,
            details,
            url,
            ..
        } => json_response(
            status,
            &UpstreamErrorBody {
                error: "RocketRez API error",
                message: status_text,
                details,
                url,
                timestamp: timestamp(),
            },
        ),
        _ => {
            error!("Proxy failure: {}", message);
            json_response(
                500,
                &ProxyErrorBody {
                    error: "Proxy server error",
                    message,
                    timestamp: timestamp(),
                },
            )
        }
    }
}

fn success_response(state: &AppState, raw: &Value) -> Result<Response<Body>, Error> {
    let data = normalize_schedules(raw);
    info!("Returning {} schedules", data.len());

    json_response(
        200,
        &ScheduleResponse {
            success: true,
            total_schedules: data.len(),
            data,
            last_updated: timestamp(),
            source: SOURCE,
            debug_info: state.config.include_debug_info.then(|| DebugInfo::from_raw(raw)),
        },
    )
}

async fn get_schedules(state: &AppState, event: &Request) -> Result<Response<Body>, Error> {
    let query = match schedule_query(event, &state.config) {
        Ok(query) => query,
        Err(e) => {
            warn!("Rejected request: {}", e);
            return error_response(e);
        }
    };

    match state.client.fetch_schedules(&query).await {
        Ok(raw) => success_response(state, &raw),
        Err(e) => error_response(e),
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    info!("Received request: method={}, path={}", method, event.uri().path());

    match method {
        "OPTIONS" => empty_response(200),
        "GET" => get_schedules(&state, &event).await,
        other => error_response(shared::Error::MethodNotAllowed(other.to_string())),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new(Config::from_env()?));

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn state_for(server: &MockServer) -> Arc<AppState> {
        Arc::new(AppState::new(Config {
            api_base_url: server.uri(),
            ..Config::default()
        }))
    }

    fn request(method: &str, params: &[(&str, &str)]) -> Request {
        let params: HashMap<String, String> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        lambda_http::http::Request::builder()
            .method(method)
            .uri("/schedules")
            .body(Body::Empty)
            .unwrap()
            .with_query_string_parameters(params)
    }

    fn credentials() -> Vec<(&'static str, &'static str)> {
        vec![("username", "agent"), ("password", "s3cret")]
    }

    fn body_json(response: &Response<Body>) -> Value {
        serde_json::from_slice(response.body().as_ref()).unwrap()
    }

    fn assert_cors(response: &Response<Body>) {
        assert_eq!(response.headers()["Access-Control-Allow-Origin"], "*");
        assert_eq!(response.headers()["Access-Control-Allow-Methods"], "GET, OPTIONS");
        assert_eq!(response.headers()["Access-Control-Allow-Headers"], "Content-Type");
    }

    fn assert_iso_timestamp(value: &Value) {
        let raw = value.as_str().expect("timestamp string");
        assert!(chrono::DateTime::parse_from_rfc3339(raw).is_ok(), "{raw}");
    }

    #[tokio::test]
    async fn options_returns_empty_preflight() {
        let server = MockServer::start().await;
        let response = handler(state_for(&server), request("OPTIONS", &[])).await.unwrap();

        assert_eq!(response.status(), 200);
        assert!(response.body().as_ref().is_empty());
        assert_cors(&response);
    }

    #[tokio::test]
    async fn other_methods_are_rejected() {
        let server = MockServer::start().await;
        let response = handler(state_for(&server), request("POST", &credentials()))
            .await
            .unwrap();

        assert_eq!(response.status(), 405);
        assert_eq!(body_json(&response), serde_json::json!({"error": "Method not allowed"}));
        assert_cors(&response);
    }

    #[tokio::test]
    async fn missing_username_is_rejected_without_upstream_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let response = handler(state_for(&server), request("GET", &[("password", "s3cret")]))
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        let body = body_json(&response);
        assert!(body["error"].is_string());
        assert_eq!(body["usage"], USAGE);
        assert_cors(&response);
    }

    #[tokio::test]
    async fn empty_password_counts_as_missing() {
        let server = MockServer::start().await;
        let response = handler(
            state_for(&server),
            request("GET", &[("username", "agent"), ("password", "")]),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn success_returns_normalized_schedules() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("SiteId", "7"))
            .and(query_param("SelectedDate", "2099-01-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Schedules": [
                    {"TourName": "Sunset Tour", "StartTime": "2099-01-01T22:00:00Z"},
                    {"TourName": "Night Tour", "StartTime": "2099-01-01T20:00:00Z", "Available": "10"},
                    {"TourName": "Private Charter", "StartTime": "2099-01-01T12:00:00Z"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut params = credentials();
        params.extend([("siteId", "7"), ("date", "2099-01-01")]);
        let response = handler(state_for(&server), request("GET", &params)).await.unwrap();

        assert_eq!(response.status(), 200);
        assert_cors(&response);
        let body = body_json(&response);
        assert_eq!(body["success"], true);
        assert_eq!(body["totalSchedules"], 2);
        assert_eq!(body["source"], SOURCE);
        assert_eq!(body["data"][0]["tourName"], "Night Tour");
        assert_eq!(body["data"][0]["available"], 10);
        assert_eq!(body["data"][0]["duration"], 75);
        assert_eq!(body["data"][1]["tourName"], "Sunset Tour");
        assert!(body["lastUpdated"].is_string());
        assert_eq!(body["debugInfo"]["responseKeys"], serde_json::json!(["Schedules"]));
    }

    #[tokio::test]
    async fn defaults_site_and_date() {
        let server = MockServer::start().await;
        let today = Utc::now().format("%Y-%m-%d").to_string();
        Mock::given(method("GET"))
            .and(query_param("SiteId", "2"))
            .and(query_param("SelectedDate", today.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let response = handler(state_for(&server), request("GET", &credentials()))
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(body_json(&response)["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn debug_info_can_be_disabled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let state = Arc::new(AppState::new(Config {
            api_base_url: server.uri(),
            include_debug_info: false,
            ..Config::default()
        }));
        let response = handler(state, request("GET", &credentials())).await.unwrap();

        assert!(body_json(&response).get("debugInfo").is_none());
    }

    #[tokio::test]
    async fn upstream_failure_status_is_mirrored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("x".repeat(500)))
            .expect(1)
            .mount(&server)
            .await;

        let response = handler(state_for(&server), request("GET", &credentials()))
            .await
            .unwrap();

        assert_eq!(response.status(), 503);
        assert_cors(&response);
        let body = body_json(&response);
        assert_eq!(body["message"], "Service Unavailable");
        assert!(body["details"].as_str().unwrap().chars().count() <= 300);
        assert!(body["url"].as_str().unwrap().contains("/tourschedules?SiteId=2"));
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn unparseable_upstream_body_is_a_proxy_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let response = handler(state_for(&server), request("GET", &credentials()))
            .await
            .unwrap();

        assert_eq!(response.status(), 500);
        assert_cors(&response);
        let body = body_json(&response);
        assert_eq!(body["error"], "Proxy server error");
        assert!(body["message"].is_string());
        assert_iso_timestamp(&body["timestamp"]);
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_proxy_error() {
        let state = Arc::new(AppState::new(Config {
            api_base_url: "http://127.0.0.1:1".to_string(),
            ..Config::default()
        }));
        let response = handler(state, request("GET", &credentials())).await.unwrap();

        assert_eq!(response.status(), 500);
        assert_cors(&response);
        let body = body_json(&response);
        assert_eq!(body["error"], "Proxy server error");
        assert!(body["message"].is_string());
        assert_iso_timestamp(&body["timestamp"]);
    }
}
