use anyhow::{bail, Result};
use reqwest::Client;
use serde::Serialize;

use super::{PublishRequest, Publisher};

/// ProGet package consumer API client.
pub struct ProGetClient {
    client: Client,
    user_agent: String,
}

impl ProGetClient {
    pub fn new(user_agent: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            user_agent: user_agent.into(),
        })
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct DependentRecord<'a> {
    feed: &'a str,
    package_name: &'a str,
    version: &'a str,
    dependent_package: DependentPackage<'a>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct DependentPackage<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    version: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    feed: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
}

impl<'a> From<PublishRequest<'a>> for DependentRecord<'a> {
    fn from(request: PublishRequest<'a>) -> Self {
        let consumer = request.consumer;
        DependentRecord {
            feed: request.feed,
            package_name: &request.dependency.name,
            version: &request.dependency.version,
            dependent_package: DependentPackage {
                name: consumer.name.as_deref(),
                version: &consumer.version,
                group: consumer.group.as_deref(),
                feed: consumer.source.feed(),
                url: consumer.source.url(),
            },
        }
    }
}

/// `POST {base}/api/dependencies/dependents`
fn dependents_url(base_url: &str) -> String {
    format!("{}/api/dependencies/dependents", base_url.trim_end_matches('/'))
}

impl Publisher for ProGetClient {
    async fn record_dependency(&self, request: PublishRequest<'_>) -> Result<()> {
        let url = dependents_url(request.base_url);
        let body = DependentRecord::from(request);

        let mut builder = self
            .client
            .post(&url)
            .header("User-Agent", &self.user_agent)
            .json(&body);
        if let Some(key) = request.api_key.filter(|k| !k.is_empty()) {
            builder = builder.header("X-ApiKey", key);
        }

        tracing::debug!(%url, package = %request.dependency, "recording package consumer");
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("{} returned {}: {}", url, status, text.trim());
        }

        Ok(())
    }
}
