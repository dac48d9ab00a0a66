use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid server URL '{0}': {1}")]
    InvalidServer(String, url::ParseError),

    #[error("Not logged in. Run `journal auth login` first")]
    NotLoggedIn,

    #[error("Invalid entry id '{0}'")]
    InvalidId(String),

    #[error("{message} ({status})")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// HTTP client for the journal server
pub struct JournalClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl JournalClient {
    pub fn new(server: &str, token: Option<String>) -> Result<Self, ClientError> {
        let base = Url::parse(server).map_err(|e| ClientError::InvalidServer(server.to_string(), e))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            token,
        })
    }

    pub fn server(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    pub async fn register(&self, email: &str, password: &str, display_name: &str) -> Result<Value, ClientError> {
        let body = json!({ "email": email, "password": password, "display_name": display_name });
        self.send(self.request(Method::POST, &["auth", "register"])?.json(&body)).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Value, ClientError> {
        let body = json!({ "email": email, "password": password });
        self.send(self.request(Method::POST, &["auth", "login"])?.json(&body)).await
    }

    pub async fn whoami(&self) -> Result<Value, ClientError> {
        self.send(self.authed(Method::GET, &["api", "auth", "whoami"])?).await
    }

    pub async fn logout(&self) -> Result<Value, ClientError> {
        self.send(self.authed(Method::DELETE, &["api", "auth", "session"])?).await
    }

    pub async fn list_entries(&self) -> Result<Value, ClientError> {
        self.send(self.authed(Method::GET, &["api", "entries"])?).await
    }

    pub async fn get_entry(&self, id: &str) -> Result<Value, ClientError> {
        self.send(self.authed(Method::GET, &entry_path(id)?)?).await
    }

    pub async fn create_entry(&self, title: &str, body: &str) -> Result<Value, ClientError> {
        let payload = json!({ "title": title, "body": body });
        self.send(self.authed(Method::POST, &["api", "entries"])?.json(&payload)).await
    }

    /// `patch` is sent as-is; it may carry `title`, `body` or both
    pub async fn update_entry(&self, id: &str, patch: &Value) -> Result<Value, ClientError> {
        self.send(self.authed(Method::PATCH, &entry_path(id)?)?.json(patch))
            .await
    }

    pub async fn delete_entry(&self, id: &str) -> Result<Value, ClientError> {
        self.send(self.authed(Method::DELETE, &entry_path(id)?)?).await
    }

    pub async fn info(&self) -> Result<Value, ClientError> {
        self.send(self.request(Method::GET, &["api"])?).await
    }

    pub async fn health(&self) -> Result<Value, ClientError> {
        self.send(
            self.request(Method::GET, &["health"])?
                .timeout(std::time::Duration::from_secs(5)),
        )
        .await
    }

    /// Append percent-encoded segments below the server's own path
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::InvalidServer(
                    self.base.to_string(),
                    url::ParseError::RelativeUrlWithCannotBeABaseBase,
                )
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        Ok(self.http.request(method, self.url(segments)?))
    }

    fn authed(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::NotLoggedIn)?;
        Ok(self.request(method, segments)?.bearer_auth(token))
    }

    /// Unwrap the `{ success, data }` envelope or surface the error body
    async fn send(&self, request: RequestBuilder) -> Result<Value, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("{} {}", status, response.url());

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        if status.is_success() {
            return Ok(body.get("data").cloned().unwrap_or(body));
        }

        Err(api_error(status, &body))
    }
}

/// Path of one entry; dot segments would escape the collection
fn entry_path(id: &str) -> Result<[&str; 3], ClientError> {
    if id.is_empty() || id == "." || id == ".." {
        return Err(ClientError::InvalidId(id.to_string()));
    }
    Ok(["api", "entries", id])
}

fn api_error(status: StatusCode, body: &Value) -> ClientError {
    let message = body
        .get("message")
        .or_else(|| body.get("error").filter(|v| v.is_string()))
        .and_then(Value::as_str)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed"))
        .to_string();
    let code = body
        .get("code")
        .and_then(Value::as_str)
        .unwrap_or("UNKNOWN")
        .to_string();

    ClientError::Api { status, code, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unparseable_server() {
        assert!(matches!(
            JournalClient::new("not a url", None),
            Err(ClientError::InvalidServer(..))
        ));
    }

    #[test]
    fn joins_paths_onto_server() {
        let client = JournalClient::new("http://localhost:3000/", None).unwrap();
        assert_eq!(client.server(), "http://localhost:3000");
        assert_eq!(
            client.url(&["api", "entries", "e1"]).unwrap().as_str(),
            "http://localhost:3000/api/entries/e1"
        );
    }

    #[test]
    fn keeps_server_path_prefix() {
        for server in ["http://host/journal/", "http://host/journal"] {
            let client = JournalClient::new(server, None).unwrap();
            assert_eq!(
                client.url(&["api", "entries"]).unwrap().as_str(),
                "http://host/journal/api/entries"
            );
        }
    }

    #[test]
    fn entry_ids_stay_inside_the_collection() {
        let client = JournalClient::new("http://host/journal/", None).unwrap();
        let url = client.url(&entry_path("../auth/whoami").unwrap()).unwrap();
        assert_eq!(url.as_str(), "http://host/journal/api/entries/..%2Fauth%2Fwhoami");

        assert!(matches!(entry_path(".."), Err(ClientError::InvalidId(_))));
        assert!(matches!(entry_path(""), Err(ClientError::InvalidId(_))));
    }

    #[test]
    fn protected_calls_need_a_token() {
        let client = JournalClient::new("http://localhost:3000", None).unwrap();
        assert!(matches!(
            client.authed(Method::GET, &["api", "entries"]),
            Err(ClientError::NotLoggedIn)
        ));
    }

    #[test]
    fn error_body_becomes_api_error() {
        let body = json!({ "error": true, "message": "You do not have permission to update entry e1", "code": "FORBIDDEN" });
        match api_error(StatusCode::FORBIDDEN, &body) {
            ClientError::Api { status, code, message } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(code, "FORBIDDEN");
                assert!(message.contains("permission"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn error_without_body_uses_reason() {
        match api_error(StatusCode::NOT_FOUND, &Value::Null) {
            ClientError::Api { message, .. } => assert_eq!(message, "Not Found"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
