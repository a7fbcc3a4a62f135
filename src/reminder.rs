use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use tracing::{error, info, warn};

use crate::engine::{now_ms, Engine};
use crate::limits::REMINDER_LEAD_MS;
use crate::model::{Booking, Ms};
use crate::observability;

/// Delivery channel for pre-start reminders.
#[async_trait]
pub trait ReminderTransport: Send + Sync {
    async fn deliver(&self, booking: &Booking) -> Result<(), String>;
}

/// Posts reminders to a Slack incoming webhook.
pub struct SlackWebhook {
    client: reqwest::Client,
    url: String,
    utc_offset_minutes: i32,
}

impl SlackWebhook {
    pub fn new(url: String, utc_offset_minutes: i32) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            utc_offset_minutes,
        }
    }
}

#[async_trait]
impl ReminderTransport for SlackWebhook {
    async fn deliver(&self, booking: &Booking) -> Result<(), String> {
        let text = format_reminder(booking, self.utc_offset_minutes);
        self.client
            .post(&self.url)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

fn format_clock(instant: Ms, utc_offset_minutes: i32) -> String {
    let local = instant + i64::from(utc_offset_minutes) * 60_000;
    match DateTime::from_timestamp_millis(local) {
        Some(dt) => dt.format("%H:%M").to_string(),
        None => format!("{instant}ms"),
    }
}

fn format_reminder(booking: &Booking, utc_offset_minutes: i32) -> String {
    format!(
        "🛁 Heads up {}: your {} slot starts at {} (until {})",
        booking.user_id,
        booking.purpose,
        format_clock(booking.slot.start, utc_offset_minutes),
        format_clock(booking.slot.end, utc_offset_minutes),
    )
}

/// Background task that delivers a reminder shortly before each booking
/// starts. A booking is due when it starts within the lead window and no
/// reminder has gone out for it yet.
pub async fn run_reminder_loop(engine: Arc<Engine>, transport: Arc<dyn ReminderTransport>) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        process_due(&engine, transport.as_ref(), now_ms()).await;
    }
}

/// One sweep of the due set. The flag is written only after a successful
/// delivery, so a failed webhook call is retried on the next sweep; a crash
/// between delivery and flag write means at worst one duplicate message.
pub async fn process_due(engine: &Engine, transport: &dyn ReminderTransport, now: Ms) {
    for booking in engine.due_reminders(now, REMINDER_LEAD_MS).await {
        match transport.deliver(&booking).await {
            Ok(()) => {
                metrics::counter!(observability::REMINDERS_SENT_TOTAL).increment(1);
                info!("reminder sent for booking {}", booking.id);
                if let Err(e) = engine.mark_reminder_sent(booking.id).await {
                    // Booking may have been cancelled between the query and
                    // the flag write
                    warn!("could not mark reminder for {}: {e}", booking.id);
                }
            }
            Err(e) => {
                metrics::counter!(observability::REMINDER_FAILURES_TOTAL).increment(1);
                error!("reminder delivery failed for {}: {e}", booking.id);
            }
        }
    }
}
