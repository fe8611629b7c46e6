use crate::error::{Result, SourceError};
use reqwest::Client;
use reqwest::header::ACCEPT;
use scenaria_core::{LinkProvider, Node, ProviderError};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "http://ja.dbpedia.org/sparql";
pub const DEFAULT_RESOURCE_NAMESPACE: &str = "http://ja.dbpedia.org/resource/";
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(500);

const SPARQL_JSON: &str = "application/sparql-results+json";

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    bindings: Vec<Binding>,
}

#[derive(Debug, Deserialize)]
struct Binding {
    link: Option<BoundValue>,
}

#[derive(Debug, Deserialize)]
struct BoundValue {
    value: String,
}

/// Wiki-link provider backed by a DBpedia SPARQL endpoint.
///
/// Calls are serialized and spaced at least `min_interval` apart.
pub struct SparqlLinkProvider {
    client: Client,
    endpoint: String,
    namespace: String,
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl SparqlLinkProvider {
    pub fn new() -> Result<Self> {
        Self::with_timeout(30)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Scenaria/0.1 (https://github.com/trapdoorsec/scenaria)")
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            namespace: DEFAULT_RESOURCE_NAMESPACE.to_string(),
            min_interval: DEFAULT_MIN_INTERVAL,
            last_call: Mutex::new(None),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(SourceError::InvalidEndpoint(endpoint));
        }
        self.endpoint = endpoint;
        Ok(self)
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// IRI of the resource page for `node`.
    pub fn resource_iri(&self, node: &str) -> String {
        let mut iri = self.namespace.clone();
        for ch in node.chars() {
            match ch {
                ' ' => iri.push('_'),
                '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' => {
                    iri.push_str(&format!("%{:02X}", ch as u32));
                }
                _ => iri.push(ch),
            }
        }
        iri
    }

    pub fn build_query(&self, node: &str) -> String {
        format!(
            r#"PREFIX dbo: <http://dbpedia.org/ontology/>
SELECT DISTINCT ?link WHERE {{
    <{}> dbo:wikiPageWikiLink ?link .
    FILTER(STRSTARTS(STR(?link), "{}"))
}}"#,
            self.resource_iri(node),
            self.namespace
        )
    }

    /// Wait until at least `min_interval` has passed since the previous call.
    async fn throttle(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last_call = Some(Instant::now());
    }

    /// Outbound wiki-links of `node`, namespace stripped, sorted and de-duplicated.
    pub async fn fetch_links(&self, node: &str) -> Result<Vec<Node>> {
        self.throttle().await;
        debug!("Querying {} for links of '{}'", self.endpoint, node);

        let response = self
            .client
            .get(&self.endpoint)
            .header(ACCEPT, SPARQL_JSON)
            .query(&[("query", self.build_query(node).as_str()), ("format", SPARQL_JSON)])
            .send()
            .await?
            .error_for_status()?;

        let parsed: SparqlResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                SourceError::ParseError(format!("Invalid SPARQL JSON: {}", e))
            } else {
                SourceError::HttpError(e)
            }
        })?;

        let links: BTreeSet<Node> = parsed
            .results
            .bindings
            .into_iter()
            .filter_map(|binding| binding.link)
            .filter_map(|bound| {
                bound
                    .value
                    .strip_prefix(&self.namespace)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
            })
            .collect();

        Ok(links.into_iter().collect())
    }
}

impl LinkProvider for SparqlLinkProvider {
    async fn get_links(&self, node: &str) -> std::result::Result<Vec<Node>, ProviderError> {
        self.fetch_links(node)
            .await
            .map_err(|e| e.into_provider_error(node))
    }
}
