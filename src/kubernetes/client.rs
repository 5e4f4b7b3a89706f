// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use kube::api::{DynamicObject, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use super::registry::{ResourceInfo, TypeRegistry};
use super::{ResourceKind, ResourceSource};

/// Timeout for connecting to K8s API
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for reading K8s API responses
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum retry attempts for transient failures
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (doubles each retry)
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// `ResourceSource` backed by a live cluster
pub struct KubeSource {
    client: Client,
    context: String,
    registry: TypeRegistry,
}

impl KubeSource {
    /// Connect using a kubeconfig file (or the standard lookup when `None`)
    /// and an optional context override
    pub async fn connect(
        kubeconfig_path: Option<&Path>,
        context: Option<&str>,
        registry: TypeRegistry,
    ) -> Result<Self> {
        let kubeconfig = match kubeconfig_path {
            Some(path) => Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig from '{}'", path.display()))?,
            None => Kubeconfig::read().context("Failed to read kubeconfig")?,
        };

        let context_name = context
            .map(String::from)
            .or_else(|| kubeconfig.current_context.clone())
            .ok_or_else(|| anyhow!("No context specified and no current context in kubeconfig"))?;

        if !kubeconfig.contexts.iter().any(|c| c.name == context_name) {
            return Err(anyhow!(
                "Context '{}' not found in kubeconfig",
                context_name
            ));
        }

        let start = std::time::Instant::now();

        let mut config = Config::from_custom_kubeconfig(
            kubeconfig,
            &KubeConfigOptions {
                context: Some(context_name.clone()),
                ..Default::default()
            },
        )
        .await
        .with_context(|| format!("Failed to load kubeconfig for context '{}'", context_name))?;

        config.connect_timeout = Some(CONNECT_TIMEOUT);
        config.read_timeout = Some(READ_TIMEOUT);

        let client = Client::try_from(config)
            .with_context(|| format!("Failed to create client for context '{}'", context_name))?;

        info!(
            context = %context_name,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Connected"
        );

        Ok(Self {
            client,
            context: context_name,
            registry,
        })
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    fn resource_info(&self, kind: ResourceKind) -> Result<&ResourceInfo> {
        super::registry::resource_info(&self.registry, kind)
            .ok_or_else(|| anyhow!("No API resource registered for {}", kind))
    }

    /// Build a dynamic API handle scoped to the kind and namespace
    fn api(&self, kind: ResourceKind, namespace: Option<&str>) -> Result<Api<DynamicObject>> {
        let info = self.resource_info(kind)?;
        let ar = &info.api_resource;
        let client = self.client.clone();

        let (api, scope) = if info.is_namespaced() {
            match namespace {
                Some(ns) => (Api::namespaced_with(client, ns, ar), "namespaced"),
                None => (Api::all_with(client, ar), "all-namespaces"),
            }
        } else {
            (Api::all_with(client, ar), "cluster-scoped")
        };

        debug!(
            kind = %kind,
            namespace = ?namespace,
            api_version = %ar.api_version,
            scope = %scope,
            "API scope"
        );
        Ok(api)
    }

    /// List with retry logic for transient failures
    async fn list_with_retry(
        &self,
        api: &Api<DynamicObject>,
        params: &ListParams,
        kind: ResourceKind,
    ) -> Result<Vec<DynamicObject>> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match api.list(params).await {
                Ok(list) => return Ok(list.items),
                Err(e) => {
                    if Self::is_retryable_error(&e) {
                        let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                        warn!(
                            kind = %kind,
                            context = %self.context,
                            attempt = attempt + 1,
                            max_attempts = MAX_RETRIES,
                            delay_ms = delay.as_millis(),
                            error = %e,
                            "Retryable error, backing off"
                        );
                        tokio::time::sleep(delay).await;
                        last_error = Some(e);
                    } else {
                        debug!(
                            kind = %kind,
                            context = %self.context,
                            error = %e,
                            "Non-retryable error"
                        );
                        return Err(anyhow!("K8s API error: {}", e));
                    }
                }
            }
        }

        Err(anyhow!(
            "Failed after {} retries: {}",
            MAX_RETRIES,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        ))
    }

    /// Get a single object with retry logic. Ok(None) on 404.
    async fn get_with_retry(
        &self,
        api: &Api<DynamicObject>,
        name: &str,
        kind: ResourceKind,
    ) -> Result<Option<DynamicObject>> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match api.get_opt(name).await {
                Ok(obj) => return Ok(obj),
                Err(e) if Self::is_retryable_error(&e) => {
                    let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                    warn!(
                        kind = %kind,
                        name = %name,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "Retryable error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(anyhow!("K8s API error: {}", e)),
            }
        }

        Err(anyhow!(
            "Failed after {} retries: {}",
            MAX_RETRIES,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        ))
    }

    /// Check if an error is retryable (transient failures)
    fn is_retryable_error(err: &kube::Error) -> bool {
        match err {
            // Network/connection errors are retryable
            kube::Error::HyperError(_) => true,
            // API errors: retry on 429 (rate limit), 503 (unavailable), 504 (timeout)
            kube::Error::Api(api_err) => matches!(api_err.code, 429 | 503 | 504),
            _ => false,
        }
    }
}

/// Field selector matching a single object name
fn name_selector(name: &str) -> String {
    format!("metadata.name={}", name)
}

#[async_trait]
impl ResourceSource for KubeSource {
    async fn list_all(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<DynamicObject>> {
        let api = self.api(kind, namespace)?;
        let items = self
            .list_with_retry(&api, &ListParams::default(), kind)
            .await?;
        debug!(kind = %kind, count = items.len(), "Listed");
        Ok(items)
    }

    async fn list_named(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Vec<DynamicObject>> {
        let api = self.api(kind, namespace)?;
        let selector = name_selector(name);
        trace!(kind = %kind, field_selector = %selector, "Built ListParams");
        let params = ListParams::default().fields(&selector);
        self.list_with_retry(&api, &params, kind).await
    }

    async fn get_one(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<DynamicObject>> {
        let api = self.api(kind, namespace)?;
        self.get_with_retry(&api, name, kind).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_selector() {
        assert_eq!(name_selector("edit"), "metadata.name=edit");
    }
}
