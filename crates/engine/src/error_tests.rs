// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rup_core::ConfigError;

#[yare::parameterized(
    task_not_found   = { DispatchError::TaskNotFound(TaskId::new("t")), "NOT_FOUND" },
    round_not_found  = { DispatchError::RoundNotFound(RoundId::new("r")), "NOT_FOUND" },
    round_completed  = { DispatchError::RoundCompleted(RoundId::new("r")), "ROUND_COMPLETED" },
    no_active        = { DispatchError::NoActiveRound, "NO_ACTIVE_ROUND" },
    invalid_input    = { DispatchError::InvalidInput("x".to_string()), "INVALID_INPUT" },
    invalid_config   = { DispatchError::InvalidConfig(ConfigError::WebhookNotHttps), "INVALID_INPUT" },
    unavailable      = { DispatchError::RoundUnavailable(RoundId::new("r")), "ROUND_UNAVAILABLE" },
    persistence      = { DispatchError::Persistence("io".to_string()), "PERSISTENCE_FAILURE" },
)]
fn dispatch_error_codes(error: DispatchError, code: &str) {
    assert_eq!(error.code(), code);
}

#[test]
fn dispatch_error_messages_are_chinese() {
    let message = DispatchError::TaskNotFound(TaskId::new("t-9")).to_string();
    assert!(message.contains("任务不存在"));
    assert!(message.contains("t-9"));
}

#[yare::parameterized(
    no_webhook = { ReportTriggerError::NoWebhook, "NO_WEBHOOK" },
    disabled   = { ReportTriggerError::ReportingDisabled, "REPORTING_DISABLED" },
    in_flight  = { ReportTriggerError::InFlight, "IN_FLIGHT" },
    http       = { ReportTriggerError::Http(502), "HTTP_ERROR" },
    exception  = { ReportTriggerError::Exception("boom".to_string()), "EXCEPTION" },
)]
fn trigger_error_codes(error: ReportTriggerError, code: &str) {
    assert_eq!(error.code(), code);
}

#[test]
fn http_error_carries_status() {
    assert!(ReportTriggerError::Http(502).to_string().contains("502"));
}
