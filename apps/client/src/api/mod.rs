/// API client: the single point of entry for calls to the ResumeRise backend.
///
/// Every request carries the shared cookie jar (session + CSRF cookies).
/// Mutating verbs attach the `X-CSRFToken` header when the jar holds a token.
/// Failed responses are unwrapped once, here, into a tagged `ApiError`.
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::multipart::Form;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::errors::{unwrap_error_response, ApiError};

pub mod backend;

pub use backend::AuthBackend;

pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "X-CSRFToken";

pub const CSRF_TOKEN_PATH: &str = "/auth/csrf-token/";
pub const LOGIN_PATH: &str = "/auth/login/";
pub const REGISTRATION_PATH: &str = "/auth/registration/";
pub const LOGOUT_PATH: &str = "/auth/logout/";
pub const USER_PATH: &str = "/auth/user/";
pub const PASSWORD_CHANGE_PATH: &str = "/auth/password/change/";
pub const QUESTIONNAIRE_PATH: &str = "/api/questionnaire/";

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    jar: Arc<Jar>,
    base_url: Url,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            jar,
            base_url: config.api_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{path}"))
            .map_err(|e| ApiError::Request(format!("invalid URL for {path}: {e}")))
    }

    /// Current value of the `csrftoken` cookie, if the backend has issued one.
    pub fn csrf_token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        let cookies = header.to_str().ok()?;
        read_cookie(cookies, CSRF_COOKIE)
    }

    pub async fn get<R>(&self, path: &str) -> Result<Option<R>, ApiError>
    where
        R: DeserializeOwned,
    {
        self.request::<(), R>(Method::GET, path, None).await
    }

    pub async fn post<T, R>(&self, path: &str, body: &T) -> Result<Option<R>, ApiError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn patch<T, R>(&self, path: &str, body: &T) -> Result<Option<R>, ApiError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete<R>(&self, path: &str) -> Result<Option<R>, ApiError>
    where
        R: DeserializeOwned,
    {
        self.request::<(), R>(Method::DELETE, path, None).await
    }

    /// JSON request. Returns `None` for 204 No Content.
    pub async fn request<T, R>(
        &self,
        method: Method,
        path: &str,
        body: Option<&T>,
    ) -> Result<Option<R>, ApiError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(path)?;
        let mut builder = self.with_csrf(&method, self.http.request(method.clone(), url));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        debug!(%method, path, "api request");
        self.send(builder).await
    }

    /// Multipart POST. The form sets its own content type.
    pub async fn post_multipart<R>(&self, path: &str, form: Form) -> Result<Option<R>, ApiError>
    where
        R: DeserializeOwned,
    {
        let url = self.url(path)?;
        let builder = self.with_csrf(&Method::POST, self.http.post(url).multipart(form));
        debug!(path, "api multipart request");
        self.send(builder).await
    }

    /// Plain GET whose only purpose is to have the backend set cookies.
    pub async fn touch(&self, path: &str) -> Result<StatusCode, ApiError> {
        let response = self.http.get(self.url(path)?).send().await?;
        Ok(response.status())
    }

    fn with_csrf(&self, method: &Method, builder: RequestBuilder) -> RequestBuilder {
        if !is_mutating(method) {
            return builder;
        }
        match self.csrf_token() {
            Some(token) => builder.header(CSRF_HEADER, token),
            None => {
                debug!(%method, "no csrf token in cookie jar; sending without header");
                builder
            }
        }
    }

    async fn send<R>(&self, builder: RequestBuilder) -> Result<Option<R>, ApiError>
    where
        R: DeserializeOwned,
    {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(%status, bytes = body.len(), "api response");

        if !status.is_success() {
            return Err(unwrap_error_response(status, &body));
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&body)?))
    }
}

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Reads one cookie out of a `Cookie:` header value (`a=1; b=2`).
pub fn read_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}
