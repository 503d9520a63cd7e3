use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use claim_flow::{ClaimRecord, IDEMPOTENCY_KEY_HEADER, validation::check_payload};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::{
    config::{Credentials, GatewayConfig},
    idempotency::{IdempotencyStore, Reservation, StoredResponse, fingerprint},
    provider::{ProviderApi, ProviderReply},
};

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

const NOT_CONFIGURED: &str = "Canopy Connect API credentials not configured";
const INTERNAL_ERROR: &str = "Internal server error";
const KEY_IN_PROGRESS: &str = "A request with this Idempotency-Key is already in progress";
const KEY_REUSED: &str = "Idempotency-Key was already used with a different claim";

type ApiResult<T> = Result<Json<T>, ApiError>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_configured_error() -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": NOT_CONFIGURED })),
    )
}

fn key_error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(json!({ "error": message })))
}

fn internal_error() -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": INTERNAL_ERROR })),
    )
}

/// Relay the provider's status; anything that is not a valid HTTP status becomes 502
fn relayed_status(reply: &ProviderReply) -> StatusCode {
    StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY)
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub provider: Arc<dyn ProviderApi>,
    pub idempotency: Arc<dyn IdempotencyStore>,
}

pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/claims", get(list_claims).post(submit_claim))
        .route("/api/policies", get(list_policies))
        .route("/api/carriers", get(list_carriers))
        .route("/api/connect", post(connect))
        .layer(from_fn(correlation_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// Tag every request with a correlation id and run it inside a span carrying it
async fn correlation_id_middleware(mut request: Request<axum::body::Body>, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    let header_value = HeaderValue::from_str(&correlation_id).ok();

    if let Some(value) = &header_value {
        request
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, value.clone());
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = header_value {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Claims Gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /api/claims": "Validate a claim and submit it to Canopy Connect",
            "GET /api/claims": "List claims filed with Canopy Connect",
            "GET /api/policies": "List policy pulls",
            "GET /api/carriers": "List supported carriers",
            "POST /api/connect": "Authenticate with Canopy Connect",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

fn idempotency_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Holds an idempotency key while its claim is with the provider. Dropped
/// before `finish` or `release` (client went away mid-flight), it hands the
/// key back in the background.
struct KeyReservation {
    store: Arc<dyn IdempotencyStore>,
    key: Option<String>,
}

impl KeyReservation {
    async fn finish(mut self, response: StoredResponse) {
        if let Some(key) = self.key.take() {
            self.store.complete(&key, response).await;
        }
    }

    async fn release(mut self) {
        if let Some(key) = self.key.take() {
            self.store.release(&key).await;
        }
    }
}

impl Drop for KeyReservation {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let store = self.store.clone();
            runtime.spawn(async move { store.release(&key).await });
        }
    }
}

async fn submit_claim(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "rejected claim body");
        bad_request_error("Invalid JSON body")
    })?;

    if let Err(e) = check_payload(&payload, state.config.amount_rule) {
        info!(reason = %e, "claim failed validation");
        return Err(bad_request_error(&e.to_string()));
    }

    let Some(credentials) = state.config.provider.submission_credentials() else {
        error!("claim submission attempted without provider credentials");
        return Err(not_configured_error());
    };

    let key = idempotency_key(&headers);
    let reservation = match &key {
        Some(key) => match state.idempotency.reserve(key, &fingerprint(&payload)).await {
            Reservation::Acquired => Some(KeyReservation {
                store: state.idempotency.clone(),
                key: Some(key.clone()),
            }),
            Reservation::Replay(stored) => {
                info!(idempotency_key = %key, "replaying stored response");
                let status = StatusCode::from_u16(stored.status).unwrap_or(StatusCode::OK);
                return Ok((status, Json(stored.body)).into_response());
            }
            Reservation::InFlight => {
                warn!(idempotency_key = %key, "duplicate claim while the first is in flight");
                return Err(key_error(StatusCode::CONFLICT, KEY_IN_PROGRESS));
            }
            Reservation::Mismatch => {
                warn!(idempotency_key = %key, "idempotency key reused with another claim");
                return Err(key_error(StatusCode::UNPROCESSABLE_ENTITY, KEY_REUSED));
            }
        },
        None => None,
    };

    let record = ClaimRecord::from_payload(&payload);
    info!(
        claim_type = %record.claim_type,
        amount = ?record.estimated_amount,
        documents = record.documents.as_array().map(Vec::len).unwrap_or(0),
        "forwarding claim to provider"
    );

    let forwarded = forward_claim(&state, &credentials, &record, key.as_deref()).await;

    match (forwarded, reservation) {
        (Ok(body), Some(reservation)) => {
            reservation
                .finish(StoredResponse {
                    status: StatusCode::OK.as_u16(),
                    body: body.clone(),
                })
                .await;
            Ok(Json(body).into_response())
        }
        (Ok(body), None) => Ok(Json(body).into_response()),
        (Err(e), Some(reservation)) => {
            reservation.release().await;
            Err(e)
        }
        (Err(e), None) => Err(e),
    }
}

async fn forward_claim(
    state: &AppState,
    credentials: &Credentials,
    record: &ClaimRecord,
    key: Option<&str>,
) -> Result<Value, ApiError> {
    let reply = state
        .provider
        .submit_servicing(credentials, record, key)
        .await
        .map_err(|e| {
            error!(error = %e, "claim submission error");
            internal_error()
        })?;

    if !reply.is_success() {
        warn!(status = reply.status, "provider rejected claim");
        let details = reply
            .json()
            .unwrap_or_else(|_| Value::String(reply.raw.clone()));
        return Err((
            relayed_status(&reply),
            Json(json!({
                "error": "Failed to submit claim to Canopy Connect",
                "details": details
            })),
        ));
    }

    let result = reply.json().map_err(|e| {
        error!(error = %e, "claim submission error");
        internal_error()
    })?;

    let mut body = json!({
        "success": true,
        "message": "Claim submitted successfully"
    });
    if let Some(id) = result.get("id") {
        info!(claim_id = %id, "claim accepted by provider");
        body["claimId"] = id.clone();
    }
    body["data"] = result;
    Ok(body)
}

/// Read-only provider collections exposed by the gateway
#[derive(Debug, Clone, Copy)]
enum Listing {
    Claims,
    Policies,
    Carriers,
}

impl Listing {
    fn envelope_key(&self) -> &'static str {
        match self {
            Listing::Claims => "claims",
            Listing::Policies => "policies",
            Listing::Carriers => "carriers",
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            Listing::Claims => "Failed to fetch claims",
            Listing::Policies => "Failed to fetch policies",
            Listing::Carriers => "Failed to fetch carriers",
        }
    }
}

async fn fetch_listing(state: &AppState, listing: Listing) -> ApiResult<Value> {
    let Some(credentials) = state.config.provider.listing_credentials() else {
        error!(listing = ?listing, "listing requested without provider credentials");
        return Err(not_configured_error());
    };

    let reply = match listing {
        Listing::Claims => state.provider.list_servicings(&credentials).await,
        Listing::Policies => state.provider.list_pulls(&credentials).await,
        Listing::Carriers => state.provider.list_carriers(&credentials).await,
    }
    .map_err(|e| {
        error!(listing = ?listing, error = %e, "listing fetch error");
        internal_error()
    })?;

    if !reply.is_success() {
        warn!(listing = ?listing, status = reply.status, "provider refused listing");
        return Err((
            relayed_status(&reply),
            Json(json!({ "error": listing.failure_message() })),
        ));
    }

    let items = reply.json().map_err(|e| {
        error!(listing = ?listing, error = %e, "listing fetch error");
        internal_error()
    })?;

    let mut body = json!({ "success": true });
    body[listing.envelope_key()] = items;
    Ok(Json(body))
}

async fn list_claims(State(state): State<AppState>) -> ApiResult<Value> {
    fetch_listing(&state, Listing::Claims).await
}

async fn list_policies(State(state): State<AppState>) -> ApiResult<Value> {
    fetch_listing(&state, Listing::Policies).await
}

async fn list_carriers(State(state): State<AppState>) -> ApiResult<Value> {
    fetch_listing(&state, Listing::Carriers).await
}

async fn connect(State(state): State<AppState>) -> ApiResult<Value> {
    let Some(credentials) = state.config.provider.submission_credentials() else {
        error!("connect requested without provider credentials");
        return Err(not_configured_error());
    };

    let reply = state
        .provider
        .consent_and_connect(&credentials)
        .await
        .map_err(|e| {
            error!(error = %e, "auth error");
            internal_error()
        })?;

    if !reply.is_success() {
        warn!(status = reply.status, "provider refused authentication");
        return Err((
            relayed_status(&reply),
            Json(json!({ "error": "Authentication failed" })),
        ));
    }

    let data = reply.json().map_err(|e| {
        error!(error = %e, "auth error");
        internal_error()
    })?;

    info!("connected to Canopy Connect");
    Ok(Json(json!({ "success": true, "data": data })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogFormat, ProviderConfig};
    use crate::idempotency::InMemoryIdempotencyStore;
    use crate::provider::ProviderError;
    use async_trait::async_trait;
    use axum::body::Body;
    use claim_flow::AmountRule;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    struct MockProvider {
        reply: ProviderReply,
        delay: Option<Duration>,
        calls: AtomicUsize,
        records: Mutex<Vec<Value>>,
        keys: Mutex<Vec<Option<String>>>,
    }

    impl MockProvider {
        fn new(status: u16, raw: &str, delay: Option<Duration>) -> Self {
            Self {
                reply: ProviderReply {
                    status,
                    raw: raw.to_string(),
                },
                delay,
                calls: AtomicUsize::new(0),
                records: Mutex::new(Vec::new()),
                keys: Mutex::new(Vec::new()),
            }
        }

        fn replying(status: u16, raw: &str) -> Arc<Self> {
            Arc::new(Self::new(status, raw, None))
        }

        fn slow(status: u16, raw: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self::new(status, raw, Some(delay)))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn record(&self) -> Result<ProviderReply, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    #[async_trait]
    impl ProviderApi for MockProvider {
        async fn submit_servicing(
            &self,
            _credentials: &Credentials,
            record: &ClaimRecord,
            idempotency_key: Option<&str>,
        ) -> Result<ProviderReply, ProviderError> {
            self.records
                .lock()
                .unwrap()
                .push(serde_json::to_value(record).unwrap());
            self.keys
                .lock()
                .unwrap()
                .push(idempotency_key.map(str::to_string));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.record()
        }

        async fn list_servicings(&self, _: &Credentials) -> Result<ProviderReply, ProviderError> {
            self.record()
        }

        async fn list_pulls(&self, _: &Credentials) -> Result<ProviderReply, ProviderError> {
            self.record()
        }

        async fn list_carriers(&self, _: &Credentials) -> Result<ProviderReply, ProviderError> {
            self.record()
        }

        async fn consent_and_connect(&self, _: &Credentials) -> Result<ProviderReply, ProviderError> {
            self.record()
        }
    }

    fn config(configured: bool, amount_rule: AmountRule) -> GatewayConfig {
        let provider = ProviderConfig::new("http://provider.invalid");
        GatewayConfig {
            bind_addr: "127.0.0.1".to_string(),
            port: 0,
            log_format: LogFormat::Pretty,
            amount_rule,
            provider: if configured {
                provider.with_credentials("client-123", "secret-456")
            } else {
                provider
            },
            idempotency: Default::default(),
        }
    }

    fn app(provider: Arc<MockProvider>, config: GatewayConfig) -> Router {
        create_app(AppState {
            config: Arc::new(config),
            provider,
            idempotency: Arc::new(InMemoryIdempotencyStore::new()),
        })
    }

    fn valid_claim() -> Value {
        json!({
            "claimType": "auto",
            "description": "Rear-end collision",
            "dateOfIncident": "2024-01-15",
            "estimatedAmount": "250.50",
            "policyNumber": "AUTO-2024-001",
            "contactPhone": "(555) 123-4567",
            "contactEmail": "john.doe@email.com",
            "documents": []
        })
    }

    fn post_claim(body: &Value) -> Request<Body> {
        Request::post("/api/claims")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_missing_field_names_first_offender() {
        let provider = MockProvider::replying(200, r#"{"id":"abc123"}"#);
        let body = json!({
            "claimType": "auto",
            "description": "",
            "dateOfIncident": "2024-01-01",
            "estimatedAmount": "100",
            "policyNumber": "P1"
        });

        let (status, json) = send(app(provider.clone(), config(true, AmountRule::Any)), post_claim(&body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Missing required field: description");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_configuration_makes_no_provider_call() {
        let provider = MockProvider::replying(200, r#"{"id":"abc123"}"#);

        let (status, json) = send(
            app(provider.clone(), config(false, AmountRule::Any)),
            post_claim(&valid_claim()),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].is_string());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_success_round_trip_and_numeric_coercion() {
        let provider = MockProvider::replying(200, r#"{"id":"abc123"}"#);

        let (status, json) = send(
            app(provider.clone(), config(true, AmountRule::Any)),
            post_claim(&valid_claim()),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Claim submitted successfully");
        assert_eq!(json["claimId"], "abc123");
        assert_eq!(json["data"], json!({ "id": "abc123" }));

        let records = provider.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["type"], "claim");
        assert_eq!(records[0]["estimatedAmount"], json!(250.5));
        assert_eq!(records[0]["contactEmail"], "john.doe@email.com");
    }

    #[tokio::test]
    async fn test_provider_rejection_is_relayed() {
        let provider = MockProvider::replying(422, r#"{"message":"policy not found"}"#);

        let (status, json) = send(
            app(provider, config(true, AmountRule::Any)),
            post_claim(&valid_claim()),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"], "Failed to submit claim to Canopy Connect");
        assert_eq!(json["details"], json!({ "message": "policy not found" }));
    }

    #[tokio::test]
    async fn test_provider_rejection_with_text_body() {
        let provider = MockProvider::replying(503, "upstream unavailable");

        let (status, json) = send(
            app(provider, config(true, AmountRule::Any)),
            post_claim(&valid_claim()),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["details"], "upstream unavailable");
    }

    #[tokio::test]
    async fn test_undecodable_success_body_is_internal_error() {
        let provider = MockProvider::replying(200, "<html>ok</html>");

        let (status, json) = send(
            app(provider, config(true, AmountRule::Any)),
            post_claim(&valid_claim()),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let provider = MockProvider::replying(200, "{}");
        let request = Request::post("/api/claims")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, json) = send(app(provider.clone(), config(true, AmountRule::Any)), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid JSON body");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_amount_rule_rejects_negative_amount() {
        let provider = MockProvider::replying(200, r#"{"id":"x"}"#);
        let mut body = valid_claim();
        body["estimatedAmount"] = json!("-10");

        let (status, json) = send(app(provider.clone(), config(true, AmountRule::NonNegative)), post_claim(&body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().starts_with("Invalid estimatedAmount"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_repeated_idempotency_key_is_replayed() {
        let provider = MockProvider::replying(200, r#"{"id":"abc123"}"#);
        let router = app(provider.clone(), config(true, AmountRule::Any));
        let keyed = || {
            Request::post("/api/claims")
                .header("content-type", "application/json")
                .header(IDEMPOTENCY_KEY_HEADER, "7d1f8a52-5a7e-4f4e-9a55-0c1a0e8f7b21")
                .body(Body::from(valid_claim().to_string()))
                .unwrap()
        };

        let (first_status, first) = send(router.clone(), keyed()).await;
        let (second_status, second) = send(router, keyed()).await;

        assert_eq!(first_status, StatusCode::OK);
        assert_eq!(second_status, StatusCode::OK);
        assert_eq!(first, second);
        assert_eq!(provider.calls(), 1);
        assert_eq!(
            provider.keys.lock().unwrap()[0].as_deref(),
            Some("7d1f8a52-5a7e-4f4e-9a55-0c1a0e8f7b21")
        );
    }

    #[tokio::test]
    async fn test_failures_are_not_replayed() {
        let provider = MockProvider::replying(500, r#"{"error":"boom"}"#);
        let router = app(provider.clone(), config(true, AmountRule::Any));
        let keyed = || {
            Request::post("/api/claims")
                .header("content-type", "application/json")
                .header(IDEMPOTENCY_KEY_HEADER, "retry-me")
                .body(Body::from(valid_claim().to_string()))
                .unwrap()
        };

        send(router.clone(), keyed()).await;
        send(router, keyed()).await;

        assert_eq!(provider.calls(), 2);
    }

    fn keyed_claim(key: &str, body: &Value) -> Request<Body> {
        Request::post("/api/claims")
            .header("content-type", "application/json")
            .header(IDEMPOTENCY_KEY_HEADER, key)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_key_reaches_provider_once() {
        let provider = MockProvider::slow(200, r#"{"id":"abc123"}"#, Duration::from_millis(200));
        let router = app(provider.clone(), config(true, AmountRule::Any));

        let (first, second) = tokio::join!(
            send(router.clone(), keyed_claim("same", &valid_claim())),
            send(router.clone(), keyed_claim("same", &valid_claim())),
        );

        let mut statuses = [first.0.as_u16(), second.0.as_u16()];
        statuses.sort();
        assert_eq!(statuses, [200, 409]);
        assert_eq!(provider.calls(), 1);

        let (status, replayed) = send(router, keyed_claim("same", &valid_claim())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(replayed["claimId"], "abc123");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_key_reused_with_other_claim_is_rejected() {
        let provider = MockProvider::replying(200, r#"{"id":"abc123"}"#);
        let router = app(provider.clone(), config(true, AmountRule::Any));
        let mut other = valid_claim();
        other["description"] = json!("Hail damage");

        let (first, _) = send(router.clone(), keyed_claim("k-1", &valid_claim())).await;
        let (second, json) = send(router, keyed_claim("k-1", &other)).await;

        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"], KEY_REUSED);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_request_hands_its_key_back() {
        let store: Arc<dyn IdempotencyStore> = Arc::new(InMemoryIdempotencyStore::new());
        assert_eq!(store.reserve("k-1", "fp").await, Reservation::Acquired);

        drop(KeyReservation {
            store: store.clone(),
            key: Some("k-1".to_string()),
        });
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        assert_eq!(store.reserve("k-1", "fp").await, Reservation::Acquired);
    }

    #[tokio::test]
    async fn test_body_without_content_type_is_parsed() {
        let provider = MockProvider::replying(200, r#"{"id":"abc123"}"#);
        let request = Request::post("/api/claims")
            .body(Body::from(valid_claim().to_string()))
            .unwrap();

        let (status, json) = send(app(provider.clone(), config(true, AmountRule::Any)), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["claimId"], "abc123");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_list_claims_wraps_provider_body() {
        let provider = MockProvider::replying(200, r#"[{"id":"c1"},{"id":"c2"}]"#);
        let request = Request::get("/api/claims").body(Body::empty()).unwrap();

        let (status, json) = send(app(provider, config(true, AmountRule::Any)), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["claims"], json!([{ "id": "c1" }, { "id": "c2" }]));
    }

    #[tokio::test]
    async fn test_list_claims_relays_provider_status() {
        let provider = MockProvider::replying(401, r#"{"error":"bad token"}"#);
        let request = Request::get("/api/claims").body(Body::empty()).unwrap();

        let (status, json) = send(app(provider, config(true, AmountRule::Any)), request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json, json!({ "error": "Failed to fetch claims" }));
    }

    #[tokio::test]
    async fn test_list_claims_needs_only_client_id() {
        let provider = MockProvider::replying(200, "[]");
        let mut config = config(false, AmountRule::Any);
        config.provider.client_id = Some("client-123".to_string());

        let request = Request::get("/api/claims").body(Body::empty()).unwrap();
        let (status, _) = send(app(provider.clone(), config), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_listings_without_configuration() {
        for uri in ["/api/claims", "/api/policies", "/api/carriers"] {
            let provider = MockProvider::replying(200, "[]");
            let request = Request::get(uri).body(Body::empty()).unwrap();

            let (status, json) = send(app(provider.clone(), config(false, AmountRule::Any)), request).await;

            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(json["error"], NOT_CONFIGURED);
            assert_eq!(provider.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_policies_and_carriers_envelopes() {
        let provider = MockProvider::replying(200, r#"[{"name":"State Farm"}]"#);
        let router = app(provider, config(true, AmountRule::Any));

        let (_, policies) = send(
            router.clone(),
            Request::get("/api/policies").body(Body::empty()).unwrap(),
        )
        .await;
        let (_, carriers) = send(
            router,
            Request::get("/api/carriers").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(policies["policies"][0]["name"], "State Farm");
        assert_eq!(carriers["carriers"][0]["name"], "State Farm");
    }

    #[tokio::test]
    async fn test_connect() {
        let provider = MockProvider::replying(200, r#"{"token":"t"}"#);
        let request = Request::post("/api/connect").body(Body::empty()).unwrap();

        let (status, json) = send(app(provider, config(true, AmountRule::Any)), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({ "success": true, "data": { "token": "t" } }));
    }

    #[tokio::test]
    async fn test_responses_carry_correlation_id() {
        let provider = MockProvider::replying(200, "{}");
        let response = app(provider, config(true, AmountRule::Any))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let id = response.headers().get(CORRELATION_ID_HEADER).unwrap();
        assert!(Uuid::parse_str(id.to_str().unwrap()).is_ok());
    }
}
