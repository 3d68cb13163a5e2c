//! REST implementation of [`ads_core::Backend`] over a blocking reqwest client.

mod wire;

use std::time::Duration;

use ads_core::{
    AuthResponse, Backend, BeneficiaryInput, BeneficiaryQuery, CategoryInput, Completeness,
    CoreError, CoreResult, Credentials, DeleteOutcome, ImageData, Page, ProfileUpdate,
    ReportPayload, ReportQuery, RequestContext,
};
use ads_domain::{
    Administrator, Beneficiary, Category, CategoryKind, Report, ReportState,
    SignatureApplication,
};
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

const SIGNATURE_PATH: &str = "/auth/firma";
const SIGNATURE_FIELD: &str = "firma";

/// Timeouts applied to every request.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl HttpClientConfig {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Talks to the guardianship backend under `base_url` (for example
/// `http://localhost:5000/api`).
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, config: &HttpClientConfig) -> CoreResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(transport_error)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    fn authed(&self, ctx: &RequestContext, method: Method, path: &str) -> RequestBuilder {
        self.request(method, path).bearer_auth(ctx.token())
    }

    /// Sends the request and returns the body of a successful response.
    fn send(&self, builder: RequestBuilder, path: &str) -> CoreResult<String> {
        let response = self.dispatch(builder, path)?;
        response.text().map_err(transport_error)
    }

    fn dispatch(&self, builder: RequestBuilder, path: &str) -> CoreResult<Response> {
        let response = builder.send().map_err(transport_error)?;
        let status = response.status();
        debug!(path, status = status.as_u16(), "backend responded");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        let err = wire::status_error(status.as_u16(), &body, wire::resource_name(path));
        if !matches!(err, CoreError::Unauthorized) {
            warn!(path, status = status.as_u16(), error = %err, "backend request failed");
        }
        Err(err)
    }

    fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder, path: &str) -> CoreResult<T> {
        let body = self.send(builder, path)?;
        wire::decode(&body)
    }

    /// Resolves an image reference recorded by the server. Absolute URLs are
    /// used as they are; paths hang off the server origin, not the API root.
    pub fn asset_url(&self, reference: &str) -> CoreResult<Url> {
        let base = Url::parse(&self.base_url)
            .map_err(|err| CoreError::InvalidOperation(format!("invalid base url: {err}")))?;
        base.join(reference.trim())
            .map_err(|err| CoreError::InvalidOperation(format!("invalid image reference: {err}")))
    }

    /// Downloads a binary body. A 404 or an empty body means no image.
    fn download(&self, builder: RequestBuilder, path: &str) -> CoreResult<Option<ImageData>> {
        let response = match self.dispatch(builder, path) {
            Ok(response) => response,
            Err(CoreError::NotFound(_)) => return Ok(None),
            Err(err) => return Err(err),
        };
        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
            .unwrap_or_else(|| "image/png".to_string());
        let bytes = response.bytes().map_err(transport_error)?.to_vec();
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(ImageData {
            file_name: signature_file_name(&mime_type).to_string(),
            mime_type,
            bytes,
        }))
    }

    fn fetch_page<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        path: &str,
    ) -> CoreResult<Page<T>> {
        let body = self.send(builder, path)?;
        wire::decode_page(&body)
    }
}

fn transport_error(err: reqwest::Error) -> CoreError {
    if err.is_timeout() {
        CoreError::Network("request timed out".into())
    } else if err.is_decode() {
        CoreError::Decode(err.to_string())
    } else {
        CoreError::Network(err.to_string())
    }
}

fn signature_file_name(mime_type: &str) -> &'static str {
    if mime_type.contains("jpeg") || mime_type.contains("jpg") {
        "firma.jpg"
    } else {
        "firma.png"
    }
}

impl Backend for HttpBackend {
    fn login(&self, credentials: &Credentials) -> CoreResult<AuthResponse> {
        let path = "/auth/login";
        self.fetch(self.request(Method::POST, path).json(credentials), path)
    }

    fn current_user(&self, ctx: &RequestContext) -> CoreResult<Administrator> {
        let path = "/auth/me";
        self.fetch(self.authed(ctx, Method::GET, path), path)
    }

    fn update_profile(
        &self,
        ctx: &RequestContext,
        update: &ProfileUpdate,
    ) -> CoreResult<Administrator> {
        let path = "/auth/profile";
        self.fetch(self.authed(ctx, Method::PUT, path).json(update), path)
    }

    fn list_beneficiaries(
        &self,
        ctx: &RequestContext,
        query: &BeneficiaryQuery,
    ) -> CoreResult<Page<Beneficiary>> {
        let path = "/beneficiari";
        let builder = self.authed(ctx, Method::GET, path).query(&query.to_pairs());
        self.fetch_page(builder, path)
    }

    fn get_beneficiary(&self, ctx: &RequestContext, id: &str) -> CoreResult<Beneficiary> {
        let path = format!("/beneficiari/{id}");
        self.fetch(self.authed(ctx, Method::GET, &path), &path)
    }

    fn create_beneficiary(
        &self,
        ctx: &RequestContext,
        input: &BeneficiaryInput,
    ) -> CoreResult<Beneficiary> {
        let path = "/beneficiari";
        self.fetch(self.authed(ctx, Method::POST, path).json(input), path)
    }

    fn update_beneficiary(
        &self,
        ctx: &RequestContext,
        id: &str,
        input: &BeneficiaryInput,
    ) -> CoreResult<Beneficiary> {
        let path = format!("/beneficiari/{id}");
        self.fetch(self.authed(ctx, Method::PUT, &path).json(input), &path)
    }

    fn delete_beneficiary(&self, ctx: &RequestContext, id: &str) -> CoreResult<DeleteOutcome> {
        let path = format!("/beneficiari/{id}");
        let body = self.send(self.authed(ctx, Method::DELETE, &path), &path)?;
        wire::decode_delete(&body)
    }

    fn reactivate_beneficiary(&self, ctx: &RequestContext, id: &str) -> CoreResult<Beneficiary> {
        let path = format!("/beneficiari/{id}/riattiva");
        self.fetch(self.authed(ctx, Method::PATCH, &path), &path)
    }

    fn beneficiary_reports(&self, ctx: &RequestContext, id: &str) -> CoreResult<Vec<Report>> {
        let path = format!("/beneficiari/{id}/rendiconti");
        let page: Page<Report> = self.fetch_page(self.authed(ctx, Method::GET, &path), &path)?;
        Ok(page.items)
    }

    fn list_categories(
        &self,
        ctx: &RequestContext,
        kind: Option<CategoryKind>,
    ) -> CoreResult<Vec<Category>> {
        let path = "/categorie";
        let mut builder = self.authed(ctx, Method::GET, path);
        if let Some(kind) = kind {
            builder = builder.query(&[("tipo", kind.as_query_value())]);
        }
        let page: Page<Category> = self.fetch_page(builder, path)?;
        Ok(page.items)
    }

    fn default_categories(&self, ctx: &RequestContext) -> CoreResult<Vec<Category>> {
        let path = "/categorie/default";
        let page: Page<Category> = self.fetch_page(self.authed(ctx, Method::GET, path), path)?;
        Ok(page.items)
    }

    fn create_category(&self, ctx: &RequestContext, input: &CategoryInput) -> CoreResult<Category> {
        let path = "/categorie";
        self.fetch(self.authed(ctx, Method::POST, path).json(input), path)
    }

    fn update_category(
        &self,
        ctx: &RequestContext,
        id: &str,
        input: &CategoryInput,
    ) -> CoreResult<Category> {
        let path = format!("/categorie/{id}");
        self.fetch(self.authed(ctx, Method::PUT, &path).json(input), &path)
    }

    fn delete_category(&self, ctx: &RequestContext, id: &str) -> CoreResult<()> {
        let path = format!("/categorie/{id}");
        self.send(self.authed(ctx, Method::DELETE, &path), &path)?;
        Ok(())
    }

    fn list_reports(&self, ctx: &RequestContext, query: &ReportQuery) -> CoreResult<Page<Report>> {
        let path = "/rendiconti";
        let builder = self.authed(ctx, Method::GET, path).query(&query.to_pairs());
        self.fetch_page(builder, path)
    }

    fn get_report(&self, ctx: &RequestContext, id: &str) -> CoreResult<Report> {
        let path = format!("/rendiconti/{id}");
        self.fetch(self.authed(ctx, Method::GET, &path), &path)
    }

    fn create_report(&self, ctx: &RequestContext, payload: &ReportPayload) -> CoreResult<Report> {
        let path = "/rendiconti";
        self.fetch(self.authed(ctx, Method::POST, path).json(payload), path)
    }

    fn update_report(
        &self,
        ctx: &RequestContext,
        id: &str,
        payload: &ReportPayload,
    ) -> CoreResult<Report> {
        let path = format!("/rendiconti/{id}");
        self.fetch(self.authed(ctx, Method::PUT, &path).json(payload), &path)
    }

    fn set_report_state(
        &self,
        ctx: &RequestContext,
        id: &str,
        state: ReportState,
    ) -> CoreResult<Report> {
        let path = format!("/rendiconti/{id}/stato");
        let body = json!({ "stato": state });
        self.fetch(self.authed(ctx, Method::PATCH, &path).json(&body), &path)
    }

    fn delete_report(&self, ctx: &RequestContext, id: &str) -> CoreResult<()> {
        let path = format!("/rendiconti/{id}");
        self.send(self.authed(ctx, Method::DELETE, &path), &path)?;
        Ok(())
    }

    fn report_completeness(&self, ctx: &RequestContext, id: &str) -> CoreResult<Completeness> {
        let path = format!("/rendiconti/{id}/completezza");
        self.fetch(self.authed(ctx, Method::GET, &path), &path)
    }

    fn upload_signature(
        &self,
        ctx: &RequestContext,
        image: &ImageData,
        password: &str,
    ) -> CoreResult<Administrator> {
        let part = multipart::Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)
            .map_err(transport_error)?;
        let form = multipart::Form::new()
            .text("password", password.to_string())
            .part(SIGNATURE_FIELD, part);
        debug!(size = image.bytes.len(), mime = %image.mime_type, "uploading signature");
        self.fetch(
            self.authed(ctx, Method::POST, SIGNATURE_PATH).multipart(form),
            SIGNATURE_PATH,
        )
    }

    fn delete_signature(&self, ctx: &RequestContext, password: &str) -> CoreResult<Administrator> {
        let body = json!({ "password": password });
        self.fetch(
            self.authed(ctx, Method::DELETE, SIGNATURE_PATH).json(&body),
            SIGNATURE_PATH,
        )
    }

    fn apply_signature(
        &self,
        ctx: &RequestContext,
        report_id: &str,
        password: &str,
    ) -> CoreResult<SignatureApplication> {
        let path = format!("/rendiconti/{report_id}/firma");
        let body = json!({ "password": password });
        self.fetch(self.authed(ctx, Method::POST, &path).json(&body), &path)
    }

    fn signature_image(&self, ctx: &RequestContext) -> CoreResult<Option<ImageData>> {
        let builder = self.authed(ctx, Method::GET, SIGNATURE_PATH);
        self.download(builder, SIGNATURE_PATH)
    }

    fn stored_image(&self, ctx: &RequestContext, reference: &str) -> CoreResult<Option<ImageData>> {
        let url = self.asset_url(reference)?;
        debug!(%url, "downloading stored image");
        let builder = self
            .client
            .request(Method::GET, url)
            .bearer_auth(ctx.token());
        self.download(builder, reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_join_without_duplicate_slashes() {
        let backend =
            HttpBackend::new("http://localhost:5000/api/", &HttpClientConfig::default()).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:5000/api");
        assert_eq!(
            backend.url("/rendiconti/r1/stato"),
            "http://localhost:5000/api/rendiconti/r1/stato"
        );
        assert_eq!(backend.url("auth/me"), "http://localhost:5000/api/auth/me");
    }

    #[test]
    fn image_references_resolve_against_the_server_origin() {
        let backend =
            HttpBackend::new("http://localhost:5000/api", &HttpClientConfig::default()).unwrap();
        assert_eq!(
            backend.asset_url("/uploads/firme/firma.png").unwrap().as_str(),
            "http://localhost:5000/uploads/firme/firma.png"
        );
        assert_eq!(
            backend
                .asset_url("https://cdn.example.it/firme/a.jpg")
                .unwrap()
                .as_str(),
            "https://cdn.example.it/firme/a.jpg"
        );
    }

    #[test]
    fn config_builders_override_timeouts() {
        let config = HttpClientConfig::default()
            .with_connect_timeout(Duration::from_secs(2))
            .with_request_timeout(Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn signature_names_follow_mime() {
        assert_eq!(signature_file_name("image/jpeg"), "firma.jpg");
        assert_eq!(signature_file_name("image/png"), "firma.png");
    }

    #[test]
    fn unreachable_backend_is_a_network_error() {
        let backend = HttpBackend::new(
            "http://127.0.0.1:9",
            &HttpClientConfig::default()
                .with_connect_timeout(Duration::from_millis(200))
                .with_request_timeout(Duration::from_millis(500)),
        )
        .unwrap();
        let credentials = Credentials {
            email: "laura.verdi@example.it".into(),
            password: "segreta".into(),
        };
        assert!(matches!(
            backend.login(&credentials),
            Err(CoreError::Network(_))
        ));
    }
}
