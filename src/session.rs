use std::io;
use std::path::PathBuf;

use serde_json::Value;

use crate::api;
use crate::client::ApiClient;
use crate::error::SessionError;
use crate::models::Credentials;

/// A single bearer token kept in a file between runs.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A missing or blank file means no token.
    pub fn load(&self) -> io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn save(&self, token: &str) -> io::Result<()> {
        std::fs::write(&self.path, token)
    }

    pub fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

/// Who is signed in, plus the loading/error pair of the last login attempt.
#[derive(Debug)]
pub struct AuthSession {
    tokens: TokenStore,
    token: Option<String>,
    user: Option<Value>,
    loading: bool,
    error: Option<String>,
}

impl AuthSession {
    pub fn restore(tokens: TokenStore) -> io::Result<Self> {
        let token = tokens.load()?;
        Ok(Self {
            tokens,
            token,
            user: None,
            loading: false,
            error: None,
        })
    }

    pub fn user(&self) -> Option<&Value> {
        self.user.as_ref()
    }

    #[cfg(test)]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user
            .as_ref()
            .and_then(|user| user.get("role"))
            .and_then(Value::as_str)
            == Some("admin")
    }

    pub fn set_token(&mut self, token: String) -> io::Result<()> {
        self.tokens.save(&token)?;
        self.token = Some(token);
        Ok(())
    }

    /// Signs in and persists the returned token. The raw response is handed back.
    pub async fn login(
        &mut self,
        client: &ApiClient,
        credentials: &Credentials,
    ) -> Result<Value, SessionError> {
        self.loading = true;
        self.error = None;
        let outcome = self.try_login(client, credentials).await;
        self.loading = false;

        if let Err(ref err) = outcome {
            self.error = Some(match err {
                SessionError::Api(api_err) => api_err.message(),
                other => other.to_string(),
            });
        }
        outcome
    }

    async fn try_login(
        &mut self,
        client: &ApiClient,
        credentials: &Credentials,
    ) -> Result<Value, SessionError> {
        let response = api::login(client, credentials).await?;
        let token = response
            .get("token")
            .and_then(Value::as_str)
            .ok_or(SessionError::MissingToken)?
            .to_string();

        self.set_token(token)?;
        self.user = response.get("user").cloned();
        tracing::info!(email = %credentials.email, "signed in");
        Ok(response)
    }

    pub fn logout(&mut self) -> io::Result<()> {
        self.token = None;
        self.user = None;
        self.tokens.clear()?;
        tracing::info!("signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DEFAULT_TIMEOUT;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> Credentials {
        Credentials {
            email: "admin@example.com".to_string(),
            password: "hunter22".to_string(),
        }
    }

    #[test]
    fn token_store_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token"));
        assert_eq!(store.load().unwrap(), None);

        store.save("abc").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("abc"));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn blank_token_file_means_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token"));
        store.save("  \n").unwrap();
        let session = AuthSession::restore(store).unwrap();
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn login_persists_token_and_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({"email": "admin@example.com", "password": "hunter22"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "jwt-123",
                "user": {"email": "admin@example.com", "role": "admin"}
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let tokens = TokenStore::new(dir.path().join("token"));
        let mut session = AuthSession::restore(tokens.clone()).unwrap();
        let client = ApiClient::new(server.uri(), DEFAULT_TIMEOUT).unwrap();

        session.login(&client, &credentials()).await.unwrap();

        assert!(session.is_authenticated());
        assert!(session.is_admin());
        assert!(!session.is_loading());
        assert_eq!(tokens.load().unwrap().as_deref(), Some("jwt-123"));

        session.logout().unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(session.user(), None);
        assert_eq!(tokens.load().unwrap(), None);
    }

    #[tokio::test]
    async fn failed_login_records_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut session = AuthSession::restore(TokenStore::new(dir.path().join("token"))).unwrap();
        let client = ApiClient::new(server.uri(), DEFAULT_TIMEOUT).unwrap();

        let err = session.login(&client, &credentials()).await.unwrap_err();
        assert!(matches!(err, SessionError::Api(_)));
        assert_eq!(session.error(), Some("Invalid credentials"));
        assert!(!session.is_authenticated());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn login_without_token_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"requires2fa": true})))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut session = AuthSession::restore(TokenStore::new(dir.path().join("token"))).unwrap();
        let client = ApiClient::new(server.uri(), DEFAULT_TIMEOUT).unwrap();

        let err = session.login(&client, &credentials()).await.unwrap_err();
        assert!(matches!(err, SessionError::MissingToken));
        assert_eq!(session.error(), Some("login response did not contain a token"));
    }
}
