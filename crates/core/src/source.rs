use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::monkey::Monkey;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("monkeys url must be configured")]
    MissingUrl,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("{0}")]
    Other(String),
}

/// Where the monkey collection comes from.
#[async_trait]
pub trait MonkeySource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Monkey>, FetchError>;
}

/// Fetches the collection with a single GET returning a JSON array.
pub struct HttpMonkeySource {
    client: Client,
    url: String,
}

impl HttpMonkeySource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("monkey-core/", env!("CARGO_PKG_VERSION")))
                .timeout(FETCH_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            url: url.into(),
        }
    }
}

#[async_trait]
impl MonkeySource for HttpMonkeySource {
    async fn fetch(&self) -> Result<Vec<Monkey>, FetchError> {
        if self.url.trim().is_empty() {
            return Err(FetchError::MissingUrl);
        }

        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::json;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn fetches_and_decodes_array() {
        let app = Router::new().route(
            "/monkeys",
            get(|| async {
                Json(json!([
                    {"Name": "Baboon", "Location": "Africa & Asia", "Population": 10000},
                    {"Name": "Mandrill", "Latitude": 1.5, "Extra": true}
                ]))
            }),
        );
        let base = serve(app).await;

        let monkeys = HttpMonkeySource::new(format!("{}/monkeys", base))
            .fetch()
            .await
            .unwrap();

        assert_eq!(monkeys.len(), 2);
        assert_eq!(monkeys[0].population, Some(10000));
        assert_eq!(monkeys[1].latitude, Some(1.5));
        assert!(monkeys[1].population.is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let app = Router::new().route("/monkeys", get(|| async { StatusCode::BAD_GATEWAY }));
        let base = serve(app).await;

        let err = HttpMonkeySource::new(format!("{}/monkeys", base))
            .fetch()
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status(502)));
    }

    #[tokio::test]
    async fn malformed_body_is_error() {
        let app = Router::new().route("/monkeys", get(|| async { "not json" }));
        let base = serve(app).await;

        let err = HttpMonkeySource::new(format!("{}/monkeys", base))
            .fetch()
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Request(_)));
    }

    #[tokio::test]
    async fn empty_url_is_rejected() {
        let err = HttpMonkeySource::new("  ").fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::MissingUrl));
    }
}
