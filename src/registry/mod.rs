//! Clients that record package consumer data in a package registry.
//!
//! The batch core only depends on [`Publisher`]; [`proget::ProGetClient`] is
//! the HTTP implementation the binary uses.

use anyhow::Result;

use crate::models::{Dependency, PackageConsumer};

pub mod proget;

/// One "this package is consumed by that package" record.
#[derive(Debug, Clone, Copy)]
pub struct PublishRequest<'a> {
    /// Base URL of the registry server.
    pub base_url: &'a str,
    /// Feed that hosts `dependency`.
    pub feed: &'a str,
    pub dependency: &'a Dependency,
    pub consumer: &'a PackageConsumer,
    pub api_key: Option<&'a str>,
}

pub trait Publisher {
    /// Record one dependency/consumer pair. Any error is fatal to the run.
    async fn record_dependency(&self, request: PublishRequest<'_>) -> Result<()>;
}
