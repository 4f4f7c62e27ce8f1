//! Typed REST client for the solar prediction service.
//!
//! One method per backend capability. All of them funnel through
//! [`ApiClient::request`], which owns the shared transport rule: JSON content
//! type by default, body parsed regardless of status, and non-2xx responses
//! normalized into [`ServiceRequestError::Backend`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use crate::api::ServiceRequestError;
use crate::config::Config;
use crate::geolocation::{self, PositionProvider, ReverseGeocoder};
use crate::models::{
    ApiErrorBody, CurrentLocationResponse, DailyPredictRequest, DailyPredictionResponse,
    ForecastResponse, GeocodeResponse, HealthResponse, LocationQuery, PredictRequest,
    PredictionResponse, ReverseGeocodeResponse, WeatherResponse,
};

/// Base URL used when none is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

// ---

/// Per-call request parts supplied by the operation methods.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    // ---
    pub method: Method,
    /// Merged over the JSON content-type default; entries here win.
    pub headers: HeaderMap,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    // ---
    pub fn get() -> Self {
        Self::default()
    }

    /// POST with `body` encoded as JSON.
    pub fn post_json<B: Serialize + ?Sized>(body: &B) -> Result<Self, ServiceRequestError> {
        // ---
        let body =
            serde_json::to_string(body).map_err(|e| ServiceRequestError::Encode(e.to_string()))?;

        Ok(Self {
            method: Method::POST,
            body: Some(body),
            ..Self::default()
        })
    }

    pub fn with_query(mut self, query: Vec<(&'static str, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Default headers with the caller's headers laid over them.
///
/// A caller header replaces every default value of the same name.
pub fn merge_headers(caller: &HeaderMap) -> HeaderMap {
    // ---
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for name in caller.keys() {
        headers.remove(name);
    }
    for (name, value) in caller {
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// Client for one prediction-service deployment.
///
/// Stateless apart from the base URL fixed at construction; clones share the
/// underlying connection pool and can be used from concurrent tasks.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ApiClient {
    // ---
    pub fn new(base_url: impl Into<String>) -> Self {
        // ---
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one request and decode the JSON response.
    ///
    /// The body is parsed whatever the status. On a non-2xx status the
    /// backend's `error` string becomes the error message, or
    /// `HTTP error! status: <code>` when it sent none.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T, ServiceRequestError> {
        // ---
        let url = format!("{}{}", self.base_url, endpoint);
        let request_id = Uuid::new_v4();
        let span = tracing::debug_span!(
            "api_request",
            %request_id,
            method = %options.method,
            endpoint
        );

        self.send(url, options).instrument(span).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        url: String,
        options: RequestOptions,
    ) -> Result<T, ServiceRequestError> {
        // ---
        debug!("{} {}", options.method, url);

        let mut builder = self
            .client
            .request(options.method, &url)
            .headers(merge_headers(&options.headers));

        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(body) = options.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        debug!("Response status {} ({} bytes)", status, text.len());

        if !status.is_success() {
            // Error bodies that are not JSON still yield a status message
            let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
            let err = ServiceRequestError::from_status(status.as_u16(), body);
            debug!("Backend reported failure: {}", err);
            return Err(err);
        }

        serde_json::from_str(&text).map_err(|e| ServiceRequestError::Decode(e.to_string()))
    }

    /// `GET /health`
    pub async fn health_check(&self) -> Result<HealthResponse, ServiceRequestError> {
        self.request("/health", RequestOptions::get()).await
    }

    /// Resolve a free-text place name to coordinates.
    pub async fn geocode(&self, location: &str) -> Result<GeocodeResponse, ServiceRequestError> {
        // ---
        let options = RequestOptions::get().with_query(vec![("location", location.to_string())]);
        self.request("/geocode", options).await
    }

    /// Best-effort place details for a coordinate; any field may be absent.
    pub async fn reverse_geocode(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<ReverseGeocodeResponse, ServiceRequestError> {
        // ---
        let options = RequestOptions::get()
            .with_query(vec![("lat", lat.to_string()), ("lon", lon.to_string())]);
        self.request("/reverse-geocode", options).await
    }

    /// Current weather for coordinates and/or place text.
    pub async fn get_weather(
        &self,
        target: &LocationQuery,
    ) -> Result<WeatherResponse, ServiceRequestError> {
        // ---
        let options = RequestOptions::get().with_query(target.to_query_pairs());
        self.request("/weather", options).await
    }

    pub async fn get_forecast(
        &self,
        target: &LocationQuery,
    ) -> Result<ForecastResponse, ServiceRequestError> {
        // ---
        let options = RequestOptions::get().with_query(target.to_query_pairs());
        self.request("/forecast", options).await
    }

    /// Single-instant generation estimate.
    pub async fn predict(
        &self,
        request: &PredictRequest,
    ) -> Result<PredictionResponse, ServiceRequestError> {
        // ---
        self.request("/predict", RequestOptions::post_json(request)?)
            .await
    }

    /// Hourly generation curve for one calendar day.
    ///
    /// A total that disagrees with the hourly values is logged, not rejected.
    pub async fn predict_daily(
        &self,
        request: &DailyPredictRequest,
    ) -> Result<DailyPredictionResponse, ServiceRequestError> {
        // ---
        let daily: DailyPredictionResponse = self
            .request("/predict/daily", RequestOptions::post_json(request)?)
            .await?;

        if let Err(mismatch) = daily.check_consistency() {
            warn!("{} for {}", mismatch, daily.date);
        }
        Ok(daily)
    }

    /// Device position enriched with reverse-geocoded place details.
    ///
    /// See [`geolocation::locate`] for the retry and error-mapping rules.
    pub async fn get_current_location<P>(
        &self,
        provider: &P,
    ) -> Result<CurrentLocationResponse, ServiceRequestError>
    where
        P: PositionProvider + ?Sized,
    {
        // ---
        Ok(geolocation::locate(provider, self).await?)
    }
}

#[async_trait]
impl ReverseGeocoder for ApiClient {
    async fn reverse_geocode(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<ReverseGeocodeResponse, ServiceRequestError> {
        ApiClient::reverse_geocode(self, lat, lon).await
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    use crate::geolocation::{FixedPosition, Position};
    use crate::models::SystemConfig;

    fn daily_body(total_kwh: f64) -> String {
        // ---
        let hourly: Vec<_> = (0..24)
            .map(|h| {
                let kwh = if (9..=15).contains(&h) { 0.5 } else { 0.0 };
                json!({ "hour": h, "generation_kwh": kwh, "solar_elevation": 0.0 })
            })
            .collect();

        json!({
            "date": "2025-03-20",
            "hourly": hourly,
            "total_kwh": total_kwh,
            "system": { "num_panels": 15, "panel_rating_w": 330, "inverter_kw": 5, "kwp": 4.95 },
            "location": { "lat": -33.87, "lon": 151.21, "name": "Sydney" }
        })
        .to_string()
    }

    #[test]
    fn test_merge_headers_defaults_to_json() {
        // ---
        let headers = merge_headers(&HeaderMap::new());
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_merge_headers_caller_overrides() {
        // ---
        let mut caller = HeaderMap::new();
        caller.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        caller.insert("x-request-source", HeaderValue::from_static("cli"));

        let headers = merge_headers(&caller);
        assert_eq!(headers.get_all(CONTENT_TYPE).iter().count(), 1);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(headers.get("x-request-source").unwrap(), "cli");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        // ---
        assert_eq!(ApiClient::new("http://example.test/api/").base_url(), "http://example.test/api");
        assert_eq!(ApiClient::default().base_url(), DEFAULT_API_URL);
    }

    #[tokio::test]
    async fn test_health_check_sends_json_content_type() {
        // ---
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/health")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_body(r#"{"status":"ok","model_loaded":true,"openweather_configured":false}"#)
            .create_async()
            .await;

        let client = ApiClient::new(format!("{}/api", server.url()));
        let health = client.health_check().await.unwrap();

        assert_eq!(health.status, "ok");
        assert!(health.model_loaded);
        assert!(!health.openweather_configured);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_caller_header_overrides_content_type() {
        // ---
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .match_header("content-type", "text/plain")
            .with_status(200)
            .with_body(r#"{"status":"ok","model_loaded":false,"openweather_configured":true}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let options =
            RequestOptions::get().with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let health: HealthResponse = client.request("/health", options).await.unwrap();

        assert_eq!(health.status, "ok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_geocode_encodes_location_text() {
        // ---
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/geocode")
            .match_query(Matcher::UrlEncoded("location".into(), "Sydney, Australia".into()))
            .with_status(200)
            .with_body(r#"{"lat":-33.8688,"lon":151.2093,"name":"Sydney","country":"AU"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let location = client.geocode("Sydney, Australia").await.unwrap();

        assert_eq!(location.name.as_deref(), Some("Sydney"));
        assert_eq!(location.lat, -33.8688);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_weather_query_omits_absent_fields() {
        // ---
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/weather")
            .match_query(Matcher::Exact("location=Oslo".into()))
            .with_status(200)
            .with_body(
                json!({
                    "weather": { "air_temperature": 4.5, "relative_humidity": 81, "wind_speed": 6.2,
                                 "wind_direction": 200, "description": "light rain" },
                    "location": { "lat": 59.91, "lon": 10.75, "name": "Oslo" }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let weather = client.get_weather(&LocationQuery::from_text("Oslo")).await.unwrap();

        assert_eq!(weather.weather.description.as_deref(), Some("light rain"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_forecast_query_uses_coordinates() {
        // ---
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/forecast")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("lat".into(), "48.85".into()),
                Matcher::UrlEncoded("lon".into(), "2.35".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"forecasts":[],"location":{"lat":48.85,"lon":2.35}}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let forecast = client
            .get_forecast(&LocationQuery::from_coords(48.85, 2.35))
            .await
            .unwrap();

        assert!(forecast.forecasts.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_backend_error_message_surfaced_exactly() {
        // ---
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/geocode")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":"invalid location"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let err = client.geocode("Atlantis").await.unwrap_err();

        assert_eq!(err.to_string(), "invalid location");
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn test_backend_error_hint_preserved() {
        // ---
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/weather")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body(r#"{"error":"Weather provider not configured","hint":"Set OPENWEATHER_API_KEY"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let err = client.get_weather(&LocationQuery::from_text("Rome")).await.unwrap_err();

        assert_eq!(err.message(), "Weather provider not configured");
        assert_eq!(err.hint(), Some("Set OPENWEATHER_API_KEY"));
    }

    #[tokio::test]
    async fn test_status_only_error_mentions_code() {
        // ---
        let mut server = Server::new_async().await;
        let _json = server
            .mock("POST", "/predict")
            .with_status(500)
            .with_body(r#"{"detail":"boom"}"#)
            .create_async()
            .await;
        let _html = server
            .mock("GET", "/health")
            .with_status(500)
            .with_body("<html>Internal Server Error</html>")
            .create_async()
            .await;

        let client = ApiClient::new(server.url());

        let err = client.predict(&PredictRequest::default()).await.unwrap_err();
        assert!(err.to_string().contains("500"));

        let err = client.health_check().await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_html_error_page_keeps_status() {
        // ---
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/weather")
            .match_query(Matcher::Any)
            .with_status(502)
            .with_body("<html>Bad Gateway</html>")
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let err = client
            .get_weather(&LocationQuery::from_text("Oslo"))
            .await
            .unwrap_err();

        match err {
            ServiceRequestError::Backend {
                status,
                ref message,
                ref hint,
            } => {
                assert_eq!(status, 502);
                assert_eq!(message, "HTTP error! status: 502");
                assert_eq!(*hint, None);
            }
            other => panic!("expected backend error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_decode_error() {
        // ---
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let err = client.health_check().await.unwrap_err();
        assert!(matches!(err, ServiceRequestError::Decode(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // ---
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(format!("http://{}/api", addr));
        let err = client.health_check().await.unwrap_err();
        assert!(matches!(err, ServiceRequestError::Transport(_)));
    }

    #[tokio::test]
    async fn test_predict_daily_posts_json_body() {
        // ---
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/predict/daily")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "location": "Sydney",
                "num_panels": 15,
                "panel_rating_w": 330.0,
                "inverter_kw": 5.0,
                "kwp": 4.95,
                "date": "2025-03-20"
            })))
            .with_status(200)
            .with_body(daily_body(3.5))
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let request = DailyPredictRequest::new(LocationQuery::from_text("Sydney"))
            .with_system(&SystemConfig::new(15, 330.0, 5.0))
            .with_date(chrono::NaiveDate::from_ymd_opt(2025, 3, 20).unwrap());
        let daily = client.predict_daily(&request).await.unwrap();

        assert_eq!(daily.hourly.len(), 24);
        assert!(daily.is_consistent());
        assert_eq!(daily.peak_hour().unwrap().hour, 9);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_predict_daily_accepts_inconsistent_total() {
        // ---
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/predict/daily")
            .with_status(200)
            .with_body(daily_body(10.0))
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let daily = client.predict_daily(&DailyPredictRequest::default()).await.unwrap();
        assert!(!daily.is_consistent());
    }

    #[tokio::test]
    async fn test_predict_daily_flags_small_total_drift() {
        // ---
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/predict/daily")
            .with_status(200)
            .with_body(daily_body(3.5005))
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let daily = client.predict_daily(&DailyPredictRequest::default()).await.unwrap();

        assert_eq!(daily.total_kwh, 3.5005);
        let mismatch = daily.check_consistency().unwrap_err();
        assert_eq!(mismatch.hourly_sum, 3.5);
    }

    #[tokio::test]
    async fn test_current_location_enriched_over_http() {
        // ---
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/reverse-geocode")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("lat".into(), "55.7".into()),
                Matcher::UrlEncoded("lon".into(), "13.19".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"city":"Lund","region":"Skåne","country":"Sweden","country_code":"SE"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let provider = FixedPosition::new(Position {
            latitude: 55.7,
            longitude: 13.19,
            accuracy: Some(12.0),
        });
        let current = client.get_current_location(&provider).await.unwrap();

        assert_eq!(current.city.as_deref(), Some("Lund"));
        assert_eq!(current.country_code.as_deref(), Some("SE"));
        assert_eq!(current.accuracy, Some(12.0));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_current_location_survives_reverse_geocode_failure() {
        // ---
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/reverse-geocode")
            .match_query(Matcher::Any)
            .with_status(502)
            .with_body(r#"{"error":"geocoder down"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let provider = FixedPosition::new(Position {
            latitude: 1.0,
            longitude: 2.0,
            accuracy: Some(30.0),
        });
        let current = client.get_current_location(&provider).await.unwrap();

        assert_eq!((current.lat, current.lon), (1.0, 2.0));
        assert_eq!(current.city, None);
        assert_eq!(current.accuracy, Some(30.0));
    }
}
