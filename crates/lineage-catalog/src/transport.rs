use crate::record::CatalogResponse;
use async_trait::async_trait;
use lineage_core::{CatalogConfig, CatalogError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error};

const USER_AGENT_VALUE: &str = concat!("lineagegraph/", env!("CARGO_PKG_VERSION"));
const ERROR_BODY_PREVIEW: usize = 200;

/// One catalog query: a free-form expression plus static parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub expression: String,
    pub params: Vec<(String, String)>,
}

impl CatalogQuery {
    /// Point lookup for a single asset.
    pub fn point(asset_id: &str) -> Self {
        Self {
            expression: format!("id:{}", asset_id),
            params: Vec::new(),
        }
    }

    pub fn search(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            params: Vec::new(),
        }
    }

    /// Id requested by a point lookup.
    pub fn point_id(&self) -> Option<&str> {
        self.expression.strip_prefix("id:")
    }

    pub fn with_params(mut self, params: &[(String, String)]) -> Self {
        self.params.extend(params.iter().cloned());
        self
    }

    pub fn param_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.params
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Wire parameters: `params` followed by `q`.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.params.clone();
        pairs.push(("q".to_string(), self.expression.clone()));
        pairs
    }
}

/// Network seam of the catalog client.
///
/// Implementations perform exactly one attempt; retries live in the client.
#[async_trait]
pub trait CatalogTransport: Send + Sync {
    async fn query(&self, query: &CatalogQuery) -> Result<CatalogResponse, CatalogError>;

    /// Human-readable endpoint, for logs.
    fn endpoint(&self) -> &str;
}

/// HTTP transport against the catalog object endpoint.
pub struct HttpCatalogTransport {
    client: Client,
    url: String,
    username: Option<String>,
    password: Option<SecretString>,
}

impl HttpCatalogTransport {
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| CatalogError::Client(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.browse_url(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }
}

#[async_trait]
impl CatalogTransport for HttpCatalogTransport {
    async fn query(&self, query: &CatalogQuery) -> Result<CatalogResponse, CatalogError> {
        let pairs = query.query_pairs();
        debug!("GET {} params={:?}", self.url, pairs);

        let mut request = self.client.get(&self.url).query(&pairs);
        if let Some(user) = &self.username {
            request = request.basic_auth(user, self.password.as_ref().map(|p| p.expose_secret()));
        }

        let response = request.send().await.map_err(map_send_error)?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let body: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            error!("Catalog API error {}: {}", status, body);
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<CatalogResponse>()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

fn map_send_error(e: reqwest::Error) -> CatalogError {
    if e.is_timeout() {
        CatalogError::Timeout(e.to_string())
    } else if e.is_builder() {
        CatalogError::Client(e.to_string())
    } else {
        CatalogError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_query_pairs() {
        let statics = vec![
            ("associations".to_string(), "core.DirectionalDataFlow".to_string()),
            ("pageSize".to_string(), "500".to_string()),
        ];
        let query = CatalogQuery::point("db/S/T").with_params(&statics);
        assert_eq!(query.point_id(), Some("db/S/T"));

        let pairs = query.query_pairs();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[2], ("q".to_string(), "id:db/S/T".to_string()));
        assert_eq!(query.param_values("pageSize").collect::<Vec<_>>(), vec!["500"]);
    }

    #[test]
    fn test_search_query_has_no_point_id() {
        assert_eq!(CatalogQuery::search("*CUSTOMER*").point_id(), None);
    }

    #[test]
    fn test_http_transport_builds_browse_url() {
        let config = CatalogConfig {
            base_url: "https://catalog.example.com/access".to_string(),
            ..Default::default()
        };
        let transport = HttpCatalogTransport::new(&config).unwrap();
        assert_eq!(
            transport.endpoint(),
            "https://catalog.example.com/access/2/catalog/data/objects"
        );
    }
}
