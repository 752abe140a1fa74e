//! HTTP transport for MAL.
//!
//! Turns each operation into a GET request, classifies transport and status
//! failures, and hands successful bodies to a [`ResponseParser`]. Page
//! formats are the parser's business.

use super::types::*;
use super::MalApi;
use crate::error::{MalError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Interprets response bodies.
///
/// Implementations report a missing user as `UserNotFound` and anything they
/// cannot make sense of as `Api`.
pub trait ResponseParser: Send + Sync {
    fn parse_anime_list(&self, user: &str, body: &str) -> Result<UserLookupResults>;

    fn parse_recent_users(&self, body: &str) -> Result<RecentUsersResults>;

    fn parse_anime_details(&self, anime_id: u32, body: &str) -> Result<AnimeDetailsResults>;
}

/// MAL client speaking HTTP.
pub struct HttpMalClient<P> {
    /// `None` once closed
    client: RwLock<Option<Client>>,
    base_url: Url,
    parser: P,
}

impl<P: ResponseParser> HttpMalClient<P> {
    /// Create a new client. `user_agent` is also how MAL receives API keys.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        user_agent: Option<&str>,
        parser: P,
    ) -> Result<Self> {
        // Without a trailing slash, Url::join would drop the last path segment.
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)
        } else {
            Url::parse(&format!("{}/", base_url))
        }
        .map_err(|e| MalError::api_with(format!("Invalid base URL {}", base_url), e))?;

        let mut builder = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .redirect(reqwest::redirect::Policy::limited(10));
        if let Some(user_agent) = user_agent {
            builder = builder.user_agent(user_agent);
        }
        let client = builder
            .build()
            .map_err(|e| MalError::api_with("Failed to create HTTP client", e))?;

        Ok(Self {
            client: RwLock::new(Some(client)),
            base_url,
            parser,
        })
    }

    pub fn from_config(config: &shared::Config, parser: P) -> Result<Self> {
        Self::new(
            &config.client.base_url,
            config.request_timeout(),
            config.client.user_agent.as_deref(),
            parser,
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn http(&self) -> Result<Client> {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| MalError::api("The MAL client has been closed."))
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| MalError::api_with(format!("Invalid endpoint {}", path), e))
    }

    /// GETs `url` and returns the body of a 200 response.
    ///
    /// A 404 becomes `not_found` when given; every other failure before the
    /// body is read is a request error.
    async fn fetch(
        &self,
        url: Url,
        not_found: Option<MalError>,
        base_error: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let client = self.http()?;
        debug!(url = %url, "Starting MAL request");

        let request = async {
            let response = client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| MalError::request_with(format!("{} {}", base_error, e), e))?;

            let status = response.status();
            debug!(status = status.as_u16(), "Got response");

            if status == StatusCode::NOT_FOUND {
                if let Some(err) = not_found {
                    return Err(err);
                }
            }
            if status != StatusCode::OK {
                return Err(MalError::request(format!(
                    "{} Status code was {}",
                    base_error,
                    status.as_u16()
                )));
            }

            response
                .text()
                .await
                .map_err(|e| MalError::request_with(format!("{} {}", base_error, e), e))
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(MalError::Canceled),
            result = request => result,
        }
    }

    fn log_rejected_body<T>(result: Result<T>, body: &str) -> Result<T> {
        if result.is_err() {
            debug!(body, "Response body");
        }
        result
    }
}

#[async_trait]
impl<P: ResponseParser> MalApi for HttpMalClient<P> {
    async fn get_anime_list_for_user(
        &self,
        user: &str,
        cancel: &CancellationToken,
    ) -> Result<UserLookupResults> {
        let mut url = self.endpoint("malappinfo.php")?;
        url.query_pairs_mut()
            .append_pair("status", "all")
            .append_pair("type", "anime")
            .append_pair("u", user);

        info!(user, url = %url, "Getting anime list for MAL user");
        let base_error = format!("Failed getting anime list for user {} using url {}", user, url);
        let body = self.fetch(url, None, &base_error, cancel).await?;

        let results = match self.parser.parse_anime_list(user, &body) {
            // Keep the message uniform no matter how the parser phrased it.
            Err(MalError::UserNotFound(_)) => Err(MalError::user_not_found(user)),
            other => Self::log_rejected_body(other, &body),
        }?;

        info!(user, "Successfully retrieved anime list");
        Ok(results)
    }

    async fn get_recent_online_users(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RecentUsersResults> {
        let url = self.endpoint("users.php")?;
        info!(url = %url, "Getting list of recent online MAL users");

        let body = self
            .fetch(url, None, "Failed getting list of recent MAL users.", cancel)
            .await?;
        let users = Self::log_rejected_body(self.parser.parse_recent_users(&body), &body)?;

        info!(count = users.users.len(), "Successfully got list of recent online MAL users");
        Ok(users)
    }

    async fn get_anime_details(
        &self,
        anime_id: u32,
        cancel: &CancellationToken,
    ) -> Result<AnimeDetailsResults> {
        let url = self.endpoint(&format!("anime/{}", anime_id))?;
        info!(anime_id, url = %url, "Getting anime details");

        let base_error = format!("Failed getting anime details for anime ID {}.", anime_id);
        let body = self
            .fetch(url, Some(MalError::anime_not_found(anime_id)), &base_error, cancel)
            .await?;
        let parsed = self.parser.parse_anime_details(anime_id, &body);
        let details = Self::log_rejected_body(parsed, &body)?;

        info!(anime_id, "Successfully got anime details");
        Ok(details)
    }

    async fn close(&self) {
        self.client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        debug!("MAL client closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Bodies are plain text: the canonical user name, whitespace separated
    /// user names, or a single genre name.
    struct PlainTextParser;

    impl ResponseParser for PlainTextParser {
        fn parse_anime_list(&self, user: &str, body: &str) -> Result<UserLookupResults> {
            if body == "<error>Invalid username</error>" {
                return Err(MalError::UserNotFound(String::new()));
            }
            if body.is_empty() {
                return Err(MalError::api(format!("Empty list document for {}", user)));
            }
            Ok(UserLookupResults::new(1, body, Vec::new()))
        }

        fn parse_recent_users(&self, body: &str) -> Result<RecentUsersResults> {
            let users: Vec<String> = body.split_whitespace().map(str::to_string).collect();
            if users.is_empty() {
                return Err(MalError::api("0 users found in recent users page html."));
            }
            Ok(RecentUsersResults { users })
        }

        fn parse_anime_details(&self, _anime_id: u32, body: &str) -> Result<AnimeDetailsResults> {
            Ok(AnimeDetailsResults {
                genres: vec![Genre {
                    genre_id: 1,
                    name: body.to_string(),
                }],
            })
        }
    }

    /// Serves one canned response to every connection and records request lines.
    async fn serve(status: &'static str, body: &'static str) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let seen = Arc::clone(&seen);
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]);
                    if let Some(line) = request.lines().next() {
                        seen.lock().unwrap().push(line.to_string());
                    }
                    let response = format!(
                        "HTTP/1.1 {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (format!("http://{}", addr), requests)
    }

    /// Accepts connections and never answers.
    async fn serve_silence() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{}", addr)
    }

    fn client(base_url: &str) -> HttpMalClient<PlainTextParser> {
        HttpMalClient::new(
            base_url,
            Duration::from_secs(5),
            Some("mal-client-tests"),
            PlainTextParser,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = client("https://myanimelist.net");
        assert_eq!(client.base_url().as_str(), "https://myanimelist.net/");
    }

    #[tokio::test]
    async fn test_invalid_base_url() {
        let result = HttpMalClient::new("not a url", Duration::from_secs(1), None, PlainTextParser);
        assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::Api));
    }

    #[tokio::test]
    async fn test_from_config() {
        let mut config = shared::Config::default();
        config.client.base_url = "http://localhost:9000/mal".to_string();
        let client = HttpMalClient::from_config(&config, PlainTextParser).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:9000/mal/");
    }

    #[tokio::test]
    async fn test_anime_list_request() {
        let (base_url, requests) = serve("200 OK", "Some_User").await;
        let client = client(&base_url);

        let lookup = client
            .get_anime_list_for_user("some user", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(lookup.canonical_user_name, "Some_User");
        let requests = requests.lock().unwrap();
        assert_eq!(
            requests[0],
            "GET /malappinfo.php?status=all&type=anime&u=some+user HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_user_not_found_from_parser() {
        let (base_url, _) = serve("200 OK", "<error>Invalid username</error>").await;
        let client = client(&base_url);

        let err = client
            .get_anime_list_for_user("ghost", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, MalError::UserNotFound(_)));
        assert_eq!(err.to_string(), "No MAL list exists for ghost.");
    }

    #[tokio::test]
    async fn test_unparseable_body_is_api_error() {
        let (base_url, _) = serve("200 OK", "").await;
        let client = client(&base_url);

        let err = client
            .get_recent_online_users(&CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Api);
    }

    #[tokio::test]
    async fn test_details_404_is_anime_not_found() {
        let (base_url, requests) = serve("404 Not Found", "").await;
        let client = client(&base_url);

        let err = client
            .get_anime_details(99999, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, MalError::AnimeNotFound(_)));
        assert_eq!(requests.lock().unwrap()[0], "GET /anime/99999 HTTP/1.1");
    }

    #[tokio::test]
    async fn test_other_404_is_request_error() {
        let (base_url, _) = serve("404 Not Found", "").await;
        let client = client(&base_url);

        let err = client
            .get_recent_online_users(&CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Request);
    }

    #[tokio::test]
    async fn test_server_error_is_request_error() {
        let (base_url, _) = serve("503 Service Unavailable", "busy").await;
        let client = client(&base_url);

        let err = client
            .get_anime_details(1, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Request);
        assert!(err.to_string().ends_with("Status code was 503"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_request_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = client(&format!("http://{}", addr));

        let err = client
            .get_recent_online_users(&CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_timeout_is_request_error() {
        let base_url = serve_silence().await;
        let client =
            HttpMalClient::new(&base_url, Duration::from_millis(100), None, PlainTextParser)
                .unwrap();

        let err = client
            .get_recent_online_users(&CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_cancel_in_flight() {
        let base_url = serve_silence().await;
        let client = client(&base_url);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = client.get_anime_details(1, &cancel).await.unwrap_err();
        assert!(err.is_canceled());
    }

    #[tokio::test]
    async fn test_precanceled_request_is_never_sent() {
        let (base_url, requests) = serve("200 OK", "alice bob").await;
        let client = client(&base_url);
        let cancel = CancellationToken::new();
        cancel.cancel();

        for _ in 0..16 {
            let err = client.get_recent_online_users(&cancel).await.unwrap_err();
            assert!(err.is_canceled());
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_closed_client_rejects_requests() {
        let (base_url, requests) = serve("200 OK", "alice bob").await;
        let client = client(&base_url);

        let users = client
            .get_recent_online_users(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(users.users, vec!["alice", "bob"]);

        client.close().await;
        let err = client
            .get_recent_online_users(&CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(requests.lock().unwrap().len(), 1);
    }
}
