use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::domain::ports::{ImageTransport, TransportResponse};
use crate::utils::error::Result;

/// 以 reqwest 實作的圖片來源，整個行程共用一個連線池
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        Self::with_proxy(None)
    }

    pub fn with_proxy(proxy: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(proxy_url) = proxy {
            tracing::debug!("Using HTTP proxy {}", proxy_url);
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl ImageTransport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<TransportResponse> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status().as_u16();
        tracing::debug!("Response status: {}", status);

        let body = if status == 200 {
            response.bytes().await?.to_vec()
        } else {
            Vec::new()
        };

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::TarotError;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_get_returns_body_on_success() {
        let server = MockServer::start();
        let image_mock = server.mock(|when, then| {
            when.method(GET).path("/Tarot/MajorArcana/0.png");
            then.status(200)
                .header("Content-Type", "image/png")
                .body(b"png-bytes".to_vec());
        });

        let transport = ReqwestTransport::new().unwrap();
        let response = transport
            .get(&server.url("/Tarot/MajorArcana/0.png"), Duration::from_secs(5))
            .await
            .unwrap();

        image_mock.assert();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"png-bytes");
    }

    #[tokio::test]
    async fn test_get_reports_error_status() {
        let server = MockServer::start();
        let missing = server.mock(|when, then| {
            when.method(GET).path("/missing.png");
            then.status(404).body("not found");
        });

        let transport = ReqwestTransport::new().unwrap();
        let response = transport
            .get(&server.url("/missing.png"), Duration::from_secs(5))
            .await
            .unwrap();

        missing.assert();
        assert_eq!(response.status, 404);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_get_times_out() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/slow.png");
            then.status(200).delay(Duration::from_millis(500)).body("late");
        });

        let transport = ReqwestTransport::new().unwrap();
        let result = transport
            .get(&server.url("/slow.png"), Duration::from_millis(50))
            .await;

        match result {
            Err(TarotError::HttpError(e)) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
