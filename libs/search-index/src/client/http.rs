//! HTTP engine client (Solr-compatible JSON API)

use super::{EngineClient, EngineRequest, EngineResponse};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use scriptorium_config::Endpoint;
use serde_json::{json, Value};

pub struct HttpEngineClient {
    client: Client,
    base_url: String,
}

impl HttpEngineClient {
    pub fn new(endpoint: &Endpoint) -> Result<Self> {
        let client = Client::builder().timeout(endpoint.timeout).build()?;
        Ok(Self {
            client,
            base_url: endpoint.base_url(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn update(&self, body: Value) -> RequestBuilder {
        self.client
            .post(self.url("update"))
            .query(&[("wt", "json")])
            .json(&body)
    }

    fn build(&self, request: EngineRequest) -> RequestBuilder {
        match request {
            EngineRequest::Update { documents } => self.update(Value::Array(
                documents.into_iter().map(Value::Object).collect(),
            )),
            EngineRequest::DeleteById { ids } => {
                let ids: Vec<String> = ids.iter().map(u64::to_string).collect();
                self.update(json!({ "delete": ids }))
            }
            EngineRequest::DeleteByQuery { query } => {
                self.update(json!({ "delete": { "query": query } }))
            }
            EngineRequest::Commit => self.update(json!({ "commit": {} })),
            EngineRequest::Rollback => self.update(json!({ "rollback": {} })),
            EngineRequest::Select { mut params } => {
                params.push(("wt".to_string(), "json".to_string()));
                self.client.get(self.url("select")).query(&params)
            }
            EngineRequest::Extract {
                file_name,
                content_type,
                body,
            } => self
                .client
                .post(self.url("update/extract"))
                .query(&[
                    ("extractOnly", "true"),
                    ("wt", "json"),
                    ("resource.name", file_name.as_str()),
                ])
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(body),
        }
    }

    async fn send(&self, builder: RequestBuilder, kind: &'static str) -> Result<EngineResponse> {
        let response = builder.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                Error::ServiceUnavailable(format!("{} request failed: {}", kind, e))
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = engine_message(&text);
            tracing::warn!(
                kind,
                status = status.as_u16(),
                message = %message,
                "Engine request failed"
            );
            return Err(Error::from_status(status.as_u16(), message));
        }

        let body: Value = response.json().await?;
        Ok(EngineResponse {
            status: status.as_u16(),
            body,
        })
    }
}

/// `error.msg` of a JSON error body, else the raw text.
fn engine_message(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|body| {
            body.pointer("/error/msg")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| text.trim().to_string())
}

#[async_trait]
impl EngineClient for HttpEngineClient {
    async fn ping(&self) -> Result<()> {
        let builder = self
            .client
            .get(self.url("admin/ping"))
            .query(&[("wt", "json")]);
        let response = self.send(builder, "ping").await?;
        match response.body.get("status").and_then(Value::as_str) {
            Some("OK") | None => Ok(()),
            Some(other) => Err(Error::ServiceUnavailable(format!(
                "ping returned status '{}'",
                other
            ))),
        }
    }

    async fn execute(&self, request: EngineRequest) -> Result<EngineResponse> {
        let kind = request.kind();
        tracing::debug!(kind, base_url = %self.base_url, "Sending engine request");
        let builder = self.build(request);
        self.send(builder, kind).await
    }
}
