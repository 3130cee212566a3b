// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration view and the manual report trigger.

use super::Dispatcher;
use crate::completion::{progress_text, ReportingState};
use crate::error::{DispatchError, ReportTriggerError};
use crate::webhook::{WebhookError, WebhookSink};
use rup_core::{Clock, ConfigPatch, DispatchConfig, IdGen};
use rup_storage::RoundSink;

impl<K, W, C, G> Dispatcher<K, W, C, G>
where
    K: RoundSink,
    W: WebhookSink,
    C: Clock,
    G: IdGen,
{
    /// Current configuration plus the reporting state.
    pub fn config(&self) -> (DispatchConfig, ReportingState) {
        let state = self.state.lock();
        (state.config.clone(), state.reporting.clone())
    }

    /// Apply a validated partial configuration update.
    ///
    /// Webhook or interval changes reconfigure the reporting schedule.
    pub fn update_config(&self, patch: &ConfigPatch) -> Result<DispatchConfig, DispatchError> {
        let mut state = self.state.lock();
        let now = self.now();

        let next = state.config.apply(patch)?;
        let reporting_changed = next.feishu_webhook_url != state.config.feishu_webhook_url
            || next.feishu_report_interval_minutes != state.config.feishu_report_interval_minutes;
        state.config = next.clone();
        if reporting_changed {
            state.reporting.reconfigure(&next, now);
        }
        tracing::info!("configuration updated");
        Ok(next)
    }

    /// Manually post a progress report to the webhook.
    ///
    /// Bypasses the completion digest (and leaves it untouched), but honors
    /// the reporting state: no URL, disabled reporting, or an in-flight post
    /// all refuse with a structured reason.
    pub async fn trigger_report(&self) -> Result<(), ReportTriggerError> {
        let (url, text) = {
            let mut state = self.state.lock();
            let url = state
                .config
                .feishu_webhook_url
                .clone()
                .ok_or(ReportTriggerError::NoWebhook)?;
            if !state.reporting.reporting_enabled {
                return Err(ReportTriggerError::ReportingDisabled);
            }
            if state.reporting.in_flight {
                return Err(ReportTriggerError::InFlight);
            }
            state.reporting.in_flight = true;
            let progress = Self::progress(&state);
            (url, progress_text(&progress))
        };

        let result = self.webhook.post(&url, &text).await;
        let now = self.now();

        let mut state = self.state.lock();
        state.reporting.in_flight = false;
        match result {
            Ok(()) => {
                let config = state.config.clone();
                state.reporting.mark_reported(&config, now);
                tracing::info!("manual report delivered");
                Ok(())
            }
            Err(WebhookError::Status(status)) => Err(ReportTriggerError::Http(status)),
            Err(WebhookError::Transport(message)) => Err(ReportTriggerError::Exception(message)),
        }
    }
}
