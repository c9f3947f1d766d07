mod client;
mod basic;
pub mod auth;

pub use client::HttpClient;
pub use basic::BasicClient;

use crate::error::FetchError;

/// GETs `url` and returns the body of a successful response.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
) -> Result<Vec<u8>, FetchError> {
    let parsed: reqwest::Url = url
        .parse()
        .map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let request_error = |source: reqwest::Error| FetchError::Request {
        url: url.to_string(),
        source,
    };
    let resp = client.execute(req).await.map_err(request_error)?;
    if !resp.status().is_success() {
        return Err(FetchError::Status(resp.status()));
    }
    Ok(resp.bytes().await.map_err(request_error)?.to_vec())
}

/// Loads feed data from a local file path or fetches it over HTTP.
pub async fn load_source<C: HttpClient + ?Sized>(
    client: &C,
    source: &str,
) -> Result<Vec<u8>, FetchError> {
    if is_http_url(source) {
        fetch_bytes(client, source).await
    } else {
        Ok(tokio::fs::read(source).await?)
    }
}

fn is_http_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers every request with a canned status and body, remembering
    /// the requests it saw.
    pub(crate) struct CannedClient {
        pub status: u16,
        pub body: &'static str,
        pub seen: Mutex<Vec<reqwest::Request>>,
    }

    impl CannedClient {
        pub(crate) fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for CannedClient {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            self.seen.lock().unwrap().push(req);
            let resp = axum::http::Response::builder()
                .status(self.status)
                .body(self.body)
                .unwrap();
            Ok(reqwest::Response::from(resp))
        }
    }

    #[tokio::test]
    async fn test_fetch_bytes_returns_body() {
        let client = CannedClient::new(200, "<Siri/>");
        let bytes = fetch_bytes(&client, "http://feed.test/status.xml").await.unwrap();
        assert_eq!(bytes, b"<Siri/>");
        let seen = client.seen.lock().unwrap();
        assert_eq!(*seen[0].method(), reqwest::Method::GET);
        assert_eq!(seen[0].url().as_str(), "http://feed.test/status.xml");
    }

    #[tokio::test]
    async fn test_fetch_bytes_rejects_error_status() {
        let client = CannedClient::new(503, "unavailable");
        let result = fetch_bytes(&client, "http://feed.test/status.xml").await;
        assert!(matches!(result, Err(FetchError::Status(s)) if s.as_u16() == 503));
    }

    #[tokio::test]
    async fn test_fetch_bytes_rejects_bad_url() {
        let client = CannedClient::new(200, "");
        let result = fetch_bytes(&client, "not a url").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
        assert!(client.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_source_reads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.xml");
        std::fs::write(&path, "<Siri/>").unwrap();

        let client = CannedClient::new(500, "");
        let bytes = load_source(&client, path.to_str().unwrap()).await.unwrap();
        assert_eq!(bytes, b"<Siri/>");
        assert!(client.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_only_http_schemes_are_urls() {
        assert!(is_http_url("http://web.mta.info/status/ServiceStatusSubway.xml"));
        assert!(is_http_url("https://api-endpoint.mta.info/feed"));
        assert!(!is_http_url("httpstatus.xml"));
        assert!(!is_http_url("http_dump/status.xml"));
        assert!(!is_http_url("/var/feeds/status.xml"));
    }

    #[tokio::test]
    async fn test_load_source_missing_file_is_io_error() {
        let client = CannedClient::new(200, "");
        let result = load_source(&client, "/nonexistent/status.xml").await;
        assert!(matches!(result, Err(FetchError::Io(_))));
    }
}
