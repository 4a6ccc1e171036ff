use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::calendar::BusinessCalendar;
use crate::model::{Booking, BookingType};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook answered {0}")]
    Status(reqwest::StatusCode),
}

/// An outgoing confirmation, ready for a mail relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
}

/// Render the booking confirmation with times in the business timezone.
pub fn booking_confirmation(booking: &Booking, calendar: &BusinessCalendar, bcc: Option<&str>) -> Message {
    let start = calendar.format(booking.start, "%Y-%m-%d %H:%M");
    let end = calendar.format(booking.end, "%H:%M");
    let label = match booking.kind {
        BookingType::Loading => "Lasting",
        BookingType::Unloading => "Lossing",
    };

    let mut lines = vec![
        "Din booking er registrert:".to_string(),
        String::new(),
        format!("Type: {}", booking.kind),
        format!("Rampe: {}", booking.ramp_number),
        format!("Tid: {start}-{end}"),
        format!("Reg.nr: {}", booking.reg_nr),
        format!("Firma: {}", booking.company),
        format!("Godstype: {}", booking.goods_type.as_str()),
        format!("Telefon: {}", booking.phone),
    ];
    if let Some(reference) = &booking.reference {
        lines.push(format!("Referanse: {reference}"));
    }
    lines.push(String::new());
    lines.push("Vennligst møt opp i god tid før slot starter.".to_string());

    Message {
        to: booking.email.clone(),
        bcc: bcc.map(str::to_string),
        subject: format!("Booking bekreftelse – {label} Rampe {} {start}", booking.ramp_number),
        body: lines.join("\n"),
    }
}

/// Outbound channel for booking confirmations. Delivery is best-effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn booking_confirmed(&self, booking: &Booking) -> Result<(), NotifyError>;
}

/// Writes confirmations to the log instead of delivering them.
pub struct LogNotifier {
    calendar: BusinessCalendar,
    bcc: Option<String>,
}

impl LogNotifier {
    pub fn new(calendar: BusinessCalendar, bcc: Option<String>) -> Self {
        Self { calendar, bcc }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn booking_confirmed(&self, booking: &Booking) -> Result<(), NotifyError> {
        let msg = booking_confirmation(booking, &self.calendar, self.bcc.as_deref());
        info!(to = %msg.to, subject = %msg.subject, "no mail relay configured, confirmation logged only");
        Ok(())
    }
}

/// POSTs each [`Message`] as JSON to a mail relay endpoint.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    calendar: BusinessCalendar,
    bcc: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: String, calendar: BusinessCalendar, bcc: Option<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url,
            calendar,
            bcc,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn booking_confirmed(&self, booking: &Booking) -> Result<(), NotifyError> {
        let msg = booking_confirmation(booking, &self.calendar, self.bcc.as_deref());
        let response = self.client.post(&self.url).json(&msg).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status));
        }
        Ok(())
    }
}
