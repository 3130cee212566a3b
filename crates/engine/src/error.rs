// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the dispatch engine.
//!
//! Display strings are the operator-facing Chinese messages; `code()` gives
//! the machine-readable kind callers branch on.

use rup_core::{ConfigError, RoundId, TaskId};
use thiserror::Error;

/// Errors surfaced by dispatcher operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("任务不存在：{0}")]
    TaskNotFound(TaskId),
    #[error("批次不存在：{0}")]
    RoundNotFound(RoundId),
    #[error("批次已完成，无法激活：{0}")]
    RoundCompleted(RoundId),
    #[error("当前没有进行中的批次")]
    NoActiveRound,
    #[error("参数无效：{0}")]
    InvalidInput(String),
    #[error("配置无效：{0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("批次数据不可用：{0}")]
    RoundUnavailable(RoundId),
    #[error("持久化存储异常：{0}")]
    Persistence(String),
}

impl DispatchError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::TaskNotFound(_) | DispatchError::RoundNotFound(_) => "NOT_FOUND",
            DispatchError::RoundCompleted(_) => "ROUND_COMPLETED",
            DispatchError::NoActiveRound => "NO_ACTIVE_ROUND",
            DispatchError::InvalidInput(_) | DispatchError::InvalidConfig(_) => "INVALID_INPUT",
            DispatchError::RoundUnavailable(_) => "ROUND_UNAVAILABLE",
            DispatchError::Persistence(_) => "PERSISTENCE_FAILURE",
        }
    }
}

/// Failure reasons for the manual report trigger.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportTriggerError {
    #[error("未配置 Webhook 地址")]
    NoWebhook,
    #[error("汇报功能已停用")]
    ReportingDisabled,
    #[error("已有汇报正在发送中")]
    InFlight,
    #[error("Webhook 请求失败（HTTP {0}）")]
    Http(u16),
    #[error("Webhook 请求异常：{0}")]
    Exception(String),
}

impl ReportTriggerError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ReportTriggerError::NoWebhook => "NO_WEBHOOK",
            ReportTriggerError::ReportingDisabled => "REPORTING_DISABLED",
            ReportTriggerError::InFlight => "IN_FLIGHT",
            ReportTriggerError::Http(_) => "HTTP_ERROR",
            ReportTriggerError::Exception(_) => "EXCEPTION",
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
