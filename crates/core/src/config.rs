// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator configuration and its validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default lease batch size when the caller does not ask for one.
pub const DEFAULT_BATCH_SIZE: u32 = 8;
/// Upper bound a lease request is clamped to.
pub const DEFAULT_MAX_BATCH_SIZE: u32 = 1000;
/// Default periodic report interval in minutes.
pub const DEFAULT_REPORT_INTERVAL_MINUTES: u32 = 240;

/// Validation failures for configuration updates.
///
/// Display text is the operator-facing Chinese message; the machine-readable
/// code for all of these is `INVALID_INPUT`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("批次大小必须为正整数")]
    NonPositiveBatchSize,
    #[error("默认批次大小不能超过最大批次大小")]
    DefaultExceedsMax,
    #[error("Webhook 地址必须以 https:// 开头")]
    WebhookNotHttps,
}

/// Runtime-tunable coordinator configuration.
///
/// Mutable only through `update_config`; every mutation is validated as a
/// whole so an invalid patch leaves the previous configuration untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchConfig {
    pub default_batch_size: u32,
    pub max_batch_size: u32,
    pub feishu_webhook_url: Option<String>,
    pub feishu_report_interval_minutes: u32,
    /// Legacy retry threshold. Recognized and round-tripped for old clients,
    /// never consulted by the timeout sweep (one-retry policy is fixed).
    pub task_failure_threshold: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_batch_size: DEFAULT_BATCH_SIZE,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            feishu_webhook_url: None,
            feishu_report_interval_minutes: DEFAULT_REPORT_INTERVAL_MINUTES,
            task_failure_threshold: 2,
        }
    }
}

impl DispatchConfig {
    /// Check the whole configuration for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_batch_size == 0 || self.max_batch_size == 0 {
            return Err(ConfigError::NonPositiveBatchSize);
        }
        if self.default_batch_size > self.max_batch_size {
            return Err(ConfigError::DefaultExceedsMax);
        }
        if let Some(url) = &self.feishu_webhook_url {
            if !url.starts_with("https://") {
                return Err(ConfigError::WebhookNotHttps);
            }
        }
        Ok(())
    }

    /// Apply a partial update, returning the new validated configuration.
    pub fn apply(&self, patch: &ConfigPatch) -> Result<DispatchConfig, ConfigError> {
        let mut next = self.clone();
        if let Some(v) = patch.default_batch_size {
            next.default_batch_size = v;
        }
        if let Some(v) = patch.max_batch_size {
            next.max_batch_size = v;
        }
        if let Some(v) = &patch.feishu_webhook_url {
            next.feishu_webhook_url = v.clone();
        }
        if let Some(v) = patch.feishu_report_interval_minutes {
            next.feishu_report_interval_minutes = v;
        }
        if let Some(v) = patch.task_failure_threshold {
            next.task_failure_threshold = v;
        }
        next.validate()?;
        Ok(next)
    }
}

/// Partial configuration update.
///
/// `feishu_webhook_url` is doubly optional: `None` leaves the URL alone,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    #[serde(default)]
    pub default_batch_size: Option<u32>,
    #[serde(default)]
    pub max_batch_size: Option<u32>,
    #[serde(
        default,
        deserialize_with = "deserialize_double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub feishu_webhook_url: Option<Option<String>>,
    #[serde(default)]
    pub feishu_report_interval_minutes: Option<u32>,
    #[serde(default)]
    pub task_failure_threshold: Option<u32>,
}

/// Treat a present-but-null JSON field as `Some(None)` (clear the value).
fn deserialize_double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Some(Option::<String>::deserialize(deserializer)?))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
