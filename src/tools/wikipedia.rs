//! Wikipedia toolkit — fetches article introductions via the MediaWiki API.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::schema::{MethodDecl, ParamDecl};
use crate::tools::{Arguments, Toolkit};

const API_URL: &str = "https://en.wikipedia.org/w/api.php";

pub struct WikipediaToolkit {
    http: reqwest::Client,
}

impl WikipediaToolkit {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Search for the most relevant article and return its normalized title.
    async fn resolve_title(&self, query: &str) -> Result<String> {
        let resp: Value = self
            .http
            .get(API_URL)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", "1"),
            ])
            .send()
            .await
            .context("Wikipedia search request failed")?
            .json()
            .await
            .context("Failed to parse Wikipedia search response")?;

        match resp["query"]["search"][0]["title"].as_str() {
            Some(title) => Ok(title.to_string()),
            None => bail!("No Wikipedia article found for '{}'", query),
        }
    }

    /// Fetch the plain-text introduction of the given article.
    async fn fetch_intro(&self, title: &str) -> Result<(String, String)> {
        let resp: Value = self
            .http
            .get(API_URL)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("titles", title),
                ("prop", "extracts"),
                ("exintro", "true"),
                ("explaintext", "true"),
                ("redirects", "1"),
            ])
            .send()
            .await
            .context("Wikipedia content request failed")?
            .json()
            .await
            .context("Failed to parse Wikipedia content response")?;

        let pages = resp["query"]["pages"]
            .as_object()
            .context("Unexpected Wikipedia response shape")?;

        for (page_id, page) in pages {
            if page_id == "-1" {
                break;
            }
            let title = page["title"].as_str().unwrap_or(title).to_string();
            if let Some(extract) = page["extract"].as_str() {
                return Ok((title, extract.trim().to_string()));
            }
        }
        bail!("No Wikipedia article found for '{}'", title)
    }
}

impl Default for WikipediaToolkit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Toolkit for WikipediaToolkit {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn methods(&self) -> Vec<MethodDecl> {
        vec![MethodDecl::new(
            "fetch_wikipedia_content",
            "Search Wikipedia and fetch the introduction of the most relevant article. \
             Always use this if the user is asking for something that is likely on Wikipedia. \
             If the user has a typo in their search query, correct it before searching.",
            vec![ParamDecl::required(
                "search_query",
                "String",
                "Search query for finding the Wikipedia article",
            )],
        )]
    }

    async fn invoke(&self, method: &str, args: &Arguments) -> Result<Value> {
        match method {
            "fetch_wikipedia_content" => {
                let query = args
                    .get("search_query")
                    .and_then(Value::as_str)
                    .context("Missing 'search_query' argument")?;

                debug!("Wikipedia lookup: {}", query);
                let title = self.resolve_title(query).await?;
                let (title, content) = self.fetch_intro(&title).await?;
                Ok(json!({ "title": title, "content": content }))
            }
            other => bail!("Unknown method: {}", other),
        }
    }
}
