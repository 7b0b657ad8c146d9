use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use weather_core::{
    Config, DateRange, FetchError, Temperature, Weather, WeatherService, WindSpeed, parse_range,
};

pub const HEALTH_MESSAGE: &str = "Weather gateway is up";

/// Failure of an inbound request, rendered as `{type, message}`.
#[derive(Debug)]
pub enum ApiError {
    /// Bad or missing query parameters.
    Validation(FetchError),
    /// Any upstream, decode or transport failure during the fan-out.
    Fetch(FetchError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, err) = match self {
            ApiError::Validation(err) => (StatusCode::BAD_REQUEST, err),
            ApiError::Fetch(err) => (StatusCode::INTERNAL_SERVER_ERROR, err),
        };
        error!(%status, kind = %err.kind, message = %err.message, "request failed");
        (status, Json(err)).into_response()
    }
}

/// `start`/`end` query values. Repeated keys keep their first value.
#[derive(Debug, Default)]
pub struct RangeQuery {
    start: Option<String>,
    end: Option<String>,
}

impl From<Vec<(String, String)>> for RangeQuery {
    fn from(pairs: Vec<(String, String)>) -> Self {
        let mut query = RangeQuery::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "start" => &mut query.start,
                "end" => &mut query.end,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }
}

impl RangeQuery {
    fn range(&self) -> Result<DateRange, ApiError> {
        parse_range(self.start.as_deref(), self.end.as_deref())
            .map_err(ApiError::Validation)
    }
}

pub fn router(service: WeatherService) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/temperatures", get(temperatures))
        .route("/speeds", get(speeds))
        .route("/weather", get(weather))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Bind the configured port and serve until Ctrl-C.
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let service = WeatherService::from_config(config)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let listener =
        TcpListener::bind(addr).await.with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "weather gateway listening");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server terminated unexpectedly")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn health() -> &'static str {
    HEALTH_MESSAGE
}

async fn temperatures(
    State(service): State<WeatherService>,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Temperature>>, ApiError> {
    let range = RangeQuery::from(query).range()?;
    let temperatures = service
        .temperatures(range)
        .await
        .map_err(ApiError::Fetch)?;
    Ok(Json(temperatures))
}

async fn speeds(
    State(service): State<WeatherService>,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<WindSpeed>>, ApiError> {
    let range = RangeQuery::from(query).range()?;
    let speeds = service
        .speeds(range)
        .await
        .map_err(ApiError::Fetch)?;
    Ok(Json(speeds))
}

async fn weather(
    State(service): State<WeatherService>,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Weather>>, ApiError> {
    let range = RangeQuery::from(query).range()?;
    let weather = service
        .weather(range)
        .await
        .map_err(ApiError::Fetch)?;
    Ok(Json(weather))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde::de::DeserializeOwned;
    use std::{
        collections::HashMap,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };
    use tower::ServiceExt;
    use weather_core::{Day, Resource, ResourceGateway};

    const MISSING: &str = "Please provide both start and end dates";
    const MALFORMED: &str =
        "Please provide dates with format ISO8601 DateTime (eg. 2018-08-12T12:00:00Z)";

    struct FakeGateway<T> {
        records: HashMap<Day, T>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl<T: Resource + Clone + Sync> ResourceGateway for FakeGateway<T> {
        type Resource = T;

        async fn fetch_at(&self, day: Day) -> Result<T, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.records
                .get(&day)
                .cloned()
                .ok_or_else(|| FetchError::not_found(format!("Resource not found for {day}")))
        }
    }

    fn day(d: u32) -> Day {
        Day::from_ymd(2018, 8, d).unwrap()
    }

    fn app_with_calls() -> (Router, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));

        let temperatures = FakeGateway {
            records: HashMap::from([
                (
                    day(1),
                    Temperature {
                        temp: 10.5353456,
                        date: day(1).to_string(),
                    },
                ),
                (
                    day(2),
                    Temperature {
                        temp: 13.5353456555445,
                        date: day(2).to_string(),
                    },
                ),
            ]),
            calls: Arc::clone(&calls),
        };
        let speeds = FakeGateway {
            records: HashMap::from([
                (
                    day(1),
                    WindSpeed {
                        north: 9.5353456087290,
                        west: -13.5353456037382,
                        date: day(1).to_string(),
                    },
                ),
                (
                    day(2),
                    WindSpeed {
                        north: 10.5353456026384,
                        west: -15.5353456074028,
                        date: day(2).to_string(),
                    },
                ),
            ]),
            calls: Arc::clone(&calls),
        };

        let service = WeatherService::new(Arc::new(temperatures), Arc::new(speeds));
        (router(service), calls)
    }

    fn app() -> Router {
        app_with_calls().0
    }

    async fn get_json<T: DeserializeOwned>(app: Router, uri: &str) -> (StatusCode, T) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn health_check() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], HEALTH_MESSAGE.as_bytes());
    }

    #[tokio::test]
    async fn temperatures_ordered_by_date() {
        let (status, temps): (_, Vec<Temperature>) =
            get_json(app(), "/temperatures?start=2018-08-01T12:00:00Z&end=2018-08-02T11:00:00Z")
                .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            temps,
            vec![
                Temperature {
                    temp: 10.5353456,
                    date: "2018-08-01T00:00:00Z".into(),
                },
                Temperature {
                    temp: 13.5353456555445,
                    date: "2018-08-02T00:00:00Z".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn speeds_ordered_by_date() {
        let (status, speeds): (_, Vec<WindSpeed>) =
            get_json(app(), "/speeds?start=2018-08-01T12:00:00Z&end=2018-08-02T11:00:00Z").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            speeds,
            vec![
                WindSpeed {
                    north: 9.5353456087290,
                    west: -13.5353456037382,
                    date: "2018-08-01T00:00:00Z".into(),
                },
                WindSpeed {
                    north: 10.5353456026384,
                    west: -15.5353456074028,
                    date: "2018-08-02T00:00:00Z".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn weather_merges_both_upstreams() {
        let (status, weather): (_, Vec<Weather>) =
            get_json(app(), "/weather?start=2018-08-01T12:00:00Z&end=2018-08-02T11:00:00Z").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            weather,
            vec![
                Weather {
                    north: 9.5353456087290,
                    west: -13.5353456037382,
                    temp: 10.5353456,
                    date: "2018-08-01T00:00:00Z".into(),
                },
                Weather {
                    north: 10.5353456026384,
                    west: -15.5353456074028,
                    temp: 13.5353456555445,
                    date: "2018-08-02T00:00:00Z".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn missing_dates_are_bad_request() {
        for path in ["/temperatures", "/speeds", "/weather"] {
            for query in ["?end=2018-08-02T11:00:00Z", "?start=2018-08-01T12:00:00Z", ""] {
                let (status, err): (_, FetchError) =
                    get_json(app(), &format!("{path}{query}")).await;

                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(err, FetchError::bad_request(MISSING));
            }
        }
    }

    #[tokio::test]
    async fn malformed_dates_are_bad_request() {
        for path in ["/temperatures", "/speeds", "/weather"] {
            for query in [
                "?start=2018-08-01&end=2018-08-01T12:00:00Z",
                "?start=2018-08-01T12:00:00Z&end=2018-08-20",
            ] {
                let (status, err): (_, FetchError) =
                    get_json(app(), &format!("{path}{query}")).await;

                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(err, FetchError::bad_request(MALFORMED));
            }
        }
    }

    #[tokio::test]
    async fn validation_failure_fetches_nothing() {
        let (app, calls) = app_with_calls();

        let (status, _): (_, FetchError) = get_json(app, "/weather?start=2018-08-01").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_day_is_internal_server_error() {
        let expected = FetchError::not_found("Resource not found for 2018-08-03T00:00:00Z");

        for path in ["/temperatures", "/speeds", "/weather"] {
            let (status, err): (_, FetchError) = get_json(
                app(),
                &format!("{path}?start=2018-08-01T12:00:00Z&end=2018-08-03T11:00:00Z"),
            )
            .await;

            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(err, expected);
        }
    }

    #[tokio::test]
    async fn repeated_query_keys_use_first_value() {
        let (status, temps): (_, Vec<Temperature>) = get_json(
            app(),
            "/temperatures?start=2018-08-01T00:00:00Z&start=2018-08-05T00:00:00Z\
             &end=2018-08-01T00:00:00Z&end=2018-08-09T00:00:00Z",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            temps,
            vec![Temperature {
                temp: 10.5353456,
                date: "2018-08-01T00:00:00Z".into(),
            }]
        );
    }

    #[tokio::test]
    async fn repeated_malformed_start_is_json_bad_request() {
        let (status, err): (_, FetchError) = get_json(
            app(),
            "/speeds?start=2018-08-01&start=2018-08-01T00:00:00Z&end=2018-08-01T00:00:00Z",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err, FetchError::bad_request(MALFORMED));
    }

    #[test]
    fn range_query_ignores_unknown_keys() {
        let query = RangeQuery::from(vec![
            ("foo".to_string(), "bar".to_string()),
            ("end".to_string(), "2018-08-02T00:00:00Z".to_string()),
            ("start".to_string(), "2018-08-01T00:00:00Z".to_string()),
        ]);

        assert_eq!(query.start.as_deref(), Some("2018-08-01T00:00:00Z"));
        assert_eq!(query.end.as_deref(), Some("2018-08-02T00:00:00Z"));
    }

    #[tokio::test]
    async fn reversed_range_is_empty_list() {
        let (app, calls) = app_with_calls();

        let (status, temps): (_, Vec<Temperature>) =
            get_json(app, "/temperatures?start=2018-08-02T00:00:00Z&end=2018-08-01T00:00:00Z")
                .await;

        assert_eq!(status, StatusCode::OK);
        assert!(temps.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
