mod admin;
mod auth;
mod books;
mod catalog;
mod chat;
mod exchanges;
mod favorites;
mod proposals;
mod users;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use cambioteca_types::api::ErrorBody;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::session::SessionStore;

/// Typed gateway to the REST backend: one method per endpoint, no retries,
/// no caching. Callers re-fetch whatever a mutation may have changed.
///
/// Every request carries the session's bearer token when one is present,
/// so a fresh login is picked up without rebuilding the client.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base: String,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: SessionStore) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            base: config.base_url.clone(),
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Start a request with the bearer token attached when logged in.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self.http.request(method, self.url(path));
        if let Some(token) = self.session.token() {
            req = req.header("Authorization", format!("Bearer {}", token));
        }
        req
    }

    /// Turn a non-2xx response into an [`ApiError`]. A 401 also tears the
    /// session down: the backend has declared our token dead.
    async fn check(&self, resp: Response) -> Result<Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body: ErrorBody = resp.json().await.unwrap_or_default();
        debug!(%status, detail = ?body.message(), "backend refused request");
        if status == StatusCode::UNAUTHORIZED {
            self.session.clear();
        }
        Err(ApiError::from_status(status, body))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self.request(Method::GET, path).send().await?;
        Ok(self.check(resp).await?.json().await?)
    }

    async fn get_json_query<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let resp = self.request(Method::GET, path).query(params).send().await?;
        Ok(self.check(resp).await?.json().await?)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let resp = self.request(Method::POST, path).json(body).send().await?;
        Ok(self.check(resp).await?.json().await?)
    }

    /// POST where the response body carries nothing we use.
    async fn post_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let resp = self.request(Method::POST, path).json(body).send().await?;
        self.check(resp).await?;
        Ok(())
    }

    async fn patch_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let resp = self.request(Method::PATCH, path).json(body).send().await?;
        Ok(self.check(resp).await?.json().await?)
    }

    async fn patch_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let resp = self.request(Method::PATCH, path).json(body).send().await?;
        self.check(resp).await?;
        Ok(())
    }

    async fn delete_unit(&self, path: &str) -> Result<(), ApiError> {
        let resp = self.request(Method::DELETE, path).send().await?;
        self.check(resp).await?;
        Ok(())
    }

    async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ApiError> {
        let resp = self
            .request(Method::POST, path)
            .multipart(form)
            .send()
            .await?;
        Ok(self.check(resp).await?.json().await?)
    }

    async fn post_multipart_unit(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<(), ApiError> {
        let resp = self
            .request(Method::POST, path)
            .multipart(form)
            .send()
            .await?;
        self.check(resp).await?;
        Ok(())
    }

    async fn patch_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ApiError> {
        let resp = self
            .request(Method::PATCH, path)
            .multipart(form)
            .send()
            .await?;
        Ok(self.check(resp).await?.json().await?)
    }
}

/// Build a multipart file part from the caller's in-memory file.
fn file_part(file: cambioteca_types::api::FilePart) -> Result<reqwest::multipart::Part, ApiError> {
    Ok(reqwest::multipart::Part::bytes(file.bytes)
        .file_name(file.file_name)
        .mime_str(&file.content_type)?)
}
