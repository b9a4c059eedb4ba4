// File: src/client/core.rs
//! HTTP implementation of [`ContentSource`] against the platform's REST API.
use crate::client::middleware::{RestHeadersLayer, RestHeadersService};
use crate::client::wire::{LinkBuilder, WireError, WireItem};
use crate::client::{ContentPage, ContentQuery, ContentSource};
use crate::config::Config;
use crate::error::ClientError;
use crate::model::{ContentItem, ItemPatch, WIRE_DATE_FORMAT};

use async_trait::async_trait;
use http::{HeaderMap, Method, Request};
use http_body_util::BodyExt;
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tower::ServiceExt;
use tower_http::auth::AddAuthorization;
use tower_layer::Layer;
use url::Url;

/// Header carrying the number of result pages for a collection query.
pub const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";

const API_PREFIX: &str = "wp-json/wp/v2/";
const ADMIN_PREFIX: &str = "wp-admin/";

type HttpsClient = AddAuthorization<
    RestHeadersService<
        Client<
            hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>,
            String,
        >,
    >,
>;

fn user_agent() -> String {
    format!("edcal/{}", env!("CARGO_PKG_VERSION"))
}

/// Normalises a site root so that relative joins land below it.
fn site_root(site_url: &str) -> Result<Url, ClientError> {
    let mut raw = site_url.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    let url = Url::parse(&raw).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::InvalidUrl(format!(
            "'{}' cannot be used as a site root",
            site_url
        )));
    }
    Ok(url)
}

#[derive(Clone, Debug)]
pub struct RestClient {
    http: HttpsClient,
    api_root: Url,
    links: LinkBuilder,
    timeout: Duration,
}

impl RestClient {
    pub fn new(
        site_url: &str,
        user: &str,
        pass: &str,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let root = site_root(site_url)?;
        let api_root = root
            .join(API_PREFIX)
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        let admin_root = root
            .join(ADMIN_PREFIX)
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;

        let mut root_store = rustls::RootCertStore::empty();
        let result = rustls_native_certs::load_native_certs();
        for err in &result.errors {
            log::warn!("Skipping unreadable system certificate: {}", err);
        }
        let (added, _) = root_store.add_parsable_certificates(result.certs);
        if added == 0 {
            log::warn!("No system certificates found; only plain http sites will work");
        }
        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let https_connector = HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .build();

        let http_client: Client<_, String> =
            Client::builder(TokioExecutor::new()).build(https_connector);
        let with_headers = RestHeadersLayer::new(&user_agent()).layer(http_client);
        let http = AddAuthorization::basic(with_headers, user, pass);

        Ok(Self {
            http,
            api_root,
            links: LinkBuilder::new(admin_root),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        Self::new(
            &config.site_url,
            &config.username,
            &config.application_password,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    fn collection_url(&self, rest_base: &str) -> Result<Url, ClientError> {
        let base = rest_base.trim_matches('/');
        if base.is_empty() {
            return Err(ClientError::InvalidUrl("empty REST base".to_string()));
        }
        self.api_root
            .join(base)
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))
    }

    fn item_url(&self, rest_base: &str, item_id: u64) -> Result<Url, ClientError> {
        let collection = self.collection_url(rest_base)?;
        let base = collection.path().trim_end_matches('/').to_string();
        collection
            .join(&format!("{}/{}", base, item_id))
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))
    }

    fn query_url(&self, query: &ContentQuery) -> Result<Url, ClientError> {
        let mut url = self.collection_url(&query.content_type.rest_base)?;
        let statuses: Vec<&str> = query.statuses.iter().map(|s| s.as_str()).collect();
        url.query_pairs_mut()
            .append_pair("context", "edit")
            .append_pair("status", &statuses.join(","))
            .append_pair("after", &query.after.format(WIRE_DATE_FORMAT).to_string())
            .append_pair("before", &query.before.format(WIRE_DATE_FORMAT).to_string())
            .append_pair("orderby", "date")
            .append_pair("order", "asc")
            .append_pair("page", &query.page.to_string())
            .append_pair("per_page", &query.per_page.to_string())
            .append_pair("_fields", "id,date,status,title,link,guid");
        Ok(url)
    }

    /// Sends a request and returns status, headers and the collected body.
    /// Non-success statuses become [`ClientError::Status`].
    async fn send(&self, req: Request<String>) -> Result<(HeaderMap, Vec<u8>), ClientError> {
        let method = req.method().clone();
        let uri = req.uri().clone();
        let call = async {
            let response = self
                .http
                .clone()
                .oneshot(req)
                .await
                .map_err(|e| ClientError::Transport(e.to_string()))?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| ClientError::Transport(e.to_string()))?
                .to_bytes()
                .to_vec();
            Ok::<_, ClientError>((status, headers, body))
        };

        let (status, headers, body) = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))??;

        log::debug!("{} {} -> {}", method, uri, status);
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: WireError::describe(&body),
            });
        }
        Ok((headers, body))
    }

    fn build_request(
        method: Method,
        url: &Url,
        body: String,
    ) -> Result<Request<String>, ClientError> {
        Request::builder()
            .method(method)
            .uri(url.as_str())
            .body(body)
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))
    }
}

fn total_pages(headers: &HeaderMap) -> u32 {
    headers
        .get(TOTAL_PAGES_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(1)
}

#[async_trait]
impl ContentSource for RestClient {
    async fn query(&self, query: &ContentQuery) -> Result<ContentPage, ClientError> {
        let url = self.query_url(query)?;
        let req = Self::build_request(Method::GET, &url, String::new())?;
        let (headers, body) = self.send(req).await?;

        let wire: Vec<WireItem> =
            serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))?;
        let rest_base = &query.content_type.rest_base;
        let mut items = Vec::with_capacity(wire.len());
        for w in wire {
            if let Some(item) = w.into_item(rest_base, &self.links)? {
                items.push(item);
            }
        }

        Ok(ContentPage {
            items,
            total_pages: total_pages(&headers),
        })
    }

    async fn update(
        &self,
        rest_base: &str,
        item_id: u64,
        patch: &ItemPatch,
    ) -> Result<Option<ContentItem>, ClientError> {
        let url = self.item_url(rest_base, item_id)?;
        let body = serde_json::to_string(patch).map_err(|e| ClientError::Decode(e.to_string()))?;
        let req = Self::build_request(Method::POST, &url, body)?;
        let (_, body) = self.send(req).await?;

        let wire: WireItem =
            serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))?;
        wire.into_item(rest_base, &self.links)
    }
}
