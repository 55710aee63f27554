// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use mprsummary_app::{FetchRequest, ProductName, StatusRecord, VersionName, WidgetCommand};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

pub const PRODUCTS_PATH: &str = "products";
pub const VERSIONS_PATH: &str = "versions";
pub const STATUS_COUNTS_PATH: &str = "prcount";
pub const TOTAL_COUNT_PATH: &str = "totalprcount";

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("backend.base_url must not be empty");
        }

        // Trailing slash so relative joins keep any path prefix.
        let base_url = Url::parse(&format!("{trimmed}/"))
            .with_context(|| format!("parse backend.base_url {base_url:?}"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!(
                "backend.base_url {:?} must use http or https",
                base_url.as_str()
            );
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn list_products(&self) -> Result<Vec<ProductName>> {
        let data = self.get_data(PRODUCTS_PATH, &[])?;
        let tokens = decode_tokens(data).context("decode product list")?;
        Ok(tokens.into_iter().map(ProductName::from).collect())
    }

    pub fn list_versions(&self, product: &ProductName) -> Result<Vec<VersionName>> {
        let data = self.get_data(VERSIONS_PATH, &[("product", product.as_str())])?;
        let tokens = decode_tokens(data)
            .with_context(|| format!("decode version list for {product}"))?;
        Ok(tokens.into_iter().map(VersionName::from).collect())
    }

    pub fn status_counts(
        &self,
        product: &ProductName,
        version: &VersionName,
    ) -> Result<Vec<StatusRecord>> {
        let data = self.get_data(
            STATUS_COUNTS_PATH,
            &[("product", product.as_str()), ("version", version.as_str())],
        )?;
        serde_json::from_value(data)
            .with_context(|| format!("decode status counts for {product} {version}"))
    }

    pub fn total_pending(&self, product: &ProductName, version: &VersionName) -> Result<u64> {
        let data = self.get_data(
            TOTAL_COUNT_PATH,
            &[("product", product.as_str()), ("version", version.as_str())],
        )?;
        let parsed: TotalCountBody = serde_json::from_value(data)
            .with_context(|| format!("decode total count for {product} {version}"))?;
        Ok(parsed.count)
    }

    pub fn ping(&self) -> Result<usize> {
        self.list_products().map(|products| products.len())
    }

    /// Run one widget fetch and turn its outcome into the command that feeds
    /// the result back into the state machine. Failures become
    /// [`WidgetCommand::ProviderFault`]; this never returns an error.
    pub fn execute(&self, request: &FetchRequest) -> WidgetCommand {
        let token = request.token();
        let kind = request.kind();
        tracing::info!(
            endpoint = kind.as_str(),
            token = token.get(),
            "fetch issued"
        );

        let outcome = match request {
            FetchRequest::Products { .. } => self
                .list_products()
                .map(|products| WidgetCommand::ProductsLoaded { token, products }),
            FetchRequest::Versions { product, .. } => self
                .list_versions(product)
                .map(|versions| WidgetCommand::VersionsLoaded { token, versions }),
            FetchRequest::Counts {
                product, version, ..
            } => self
                .status_counts(product, version)
                .map(|records| WidgetCommand::CountsLoaded { token, records }),
            FetchRequest::Total {
                product, version, ..
            } => self
                .total_pending(product, version)
                .map(|count| WidgetCommand::TotalLoaded { token, count }),
        };

        match outcome {
            Ok(command) => {
                tracing::info!(endpoint = kind.as_str(), token = token.get(), "fetch done");
                command
            }
            Err(error) => {
                tracing::warn!(
                    endpoint = kind.as_str(),
                    token = token.get(),
                    "provider fault: {error:#}"
                );
                WidgetCommand::ProviderFault {
                    kind,
                    token,
                    message: format!("{error:#}"),
                }
            }
        }
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path)
            .with_context(|| format!("build URL for /{path}"))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn get_data(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = self.endpoint(path, query)?;
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let envelope: Value = response
            .json()
            .with_context(|| format!("decode /{path} response"))?;
        take_data(envelope).with_context(|| format!("read /{path} response"))
    }
}

/// Pull the `data` member out of a response envelope.
fn take_data(envelope: Value) -> Result<Value> {
    match envelope {
        Value::Object(mut map) => map
            .remove("data")
            .ok_or_else(|| anyhow!("response has no data property")),
        other => bail!("expected a JSON object envelope, got {}", json_kind(&other)),
    }
}

/// Product and version lists arrive either as an array or as an object whose
/// values are the options, in document order.
fn decode_tokens(data: Value) -> Result<Vec<String>> {
    let values = match data {
        Value::Array(items) => items,
        Value::Object(map) => map.into_iter().map(|(_, value)| value).collect(),
        other => bail!("expected an array or object of options, got {}", json_kind(&other)),
    };

    Ok(values.into_iter().filter_map(token_text).collect())
}

fn token_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check [backend].base_url and that the MPR service is running ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.error.or(parsed.message)
        && !message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message);
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct TotalCountBody {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
    message: Option<String>,
}
