//! Preview mail composition.

use crate::config::SmtpConfig;
use crate::sensors::TelemetryReading;

pub const SUBJECT: &str = "PiCam Triggered!";
pub const LOW_BATTERY_LINE: &str = "LOW BATTERY!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn jpeg(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: "image/jpeg",
            data,
        }
    }
}

/// Everything the mail transport needs, independent of the wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

impl PreviewMail {
    /// Body: optional low-battery warning, the telemetry line, then the
    /// photo file name when one was saved.
    pub fn compose(
        smtp: &SmtpConfig,
        telemetry: &TelemetryReading,
        low_battery_percent: u8,
        photo_name: Option<&str>,
        attachments: Vec<Attachment>,
    ) -> Self {
        let mut lines = Vec::with_capacity(3);
        if telemetry.is_low_battery(low_battery_percent) {
            lines.push(LOW_BATTERY_LINE.to_owned());
        }
        lines.push(telemetry.to_string());
        if let Some(name) = photo_name {
            lines.push(format!("Photo: {name}"));
        }
        Self {
            from: smtp.from.clone(),
            to: smtp.to.clone(),
            subject: SUBJECT.to_owned(),
            body: lines.join("\n"),
            attachments,
        }
    }
}
