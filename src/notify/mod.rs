//! Store-and-forward notification over the dial-up link.
//!
//! ```text
//!   deliver(request)
//!   ────────────────
//!   compose mail (mosaic, optional photo preview, telemetry body)
//!   modem power ON
//!   link.connect()  ── down ──▶ LinkDown
//!        │ up
//!   mailer.send()   ── err  ──▶ DeliveryFailed
//!        │ ok                       │
//!        ▼                          │
//!      Sent                         │
//!   link.disconnect(); modem power OFF   (always)
//! ```
//!
//! Nothing is queued: a mail that could not be sent is dropped and the
//! next capture session starts from scratch.

pub mod mail;
pub mod mosaic;

use std::path::PathBuf;

use log::{error, info, warn};

use crate::app::ports::{Clock, LinkPort, MailTransport, ModemPowerPort, NotifyPort};
use crate::config::{Resolution, SmtpConfig, SystemConfig};
use crate::power::LinkController;
use crate::sensors::TelemetryReading;
use mail::{Attachment, PreviewMail};
use mosaic::Mosaic;

/// What a finished capture session hands to the notifier.
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyRequest {
    /// Session timestamp, `%Y%m%d%H%M%S`.
    pub stamp: String,
    pub mosaic: Option<Mosaic>,
    /// Still photo saved by the session, if any.
    pub photo: Option<PathBuf>,
    pub telemetry: TelemetryReading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    /// The link did not come up within the timeout.
    LinkDown,
    /// Link was up but the relay refused or dropped the mail.
    DeliveryFailed,
}

pub struct Notifier<L, P, M, C> {
    link: LinkController<L, C>,
    modem: P,
    mailer: M,
    smtp: SmtpConfig,
    low_battery_percent: u8,
    preview_res: Resolution,
    quality: u8,
}

impl<L, P, M, C> Notifier<L, P, M, C>
where
    L: LinkPort,
    P: ModemPowerPort,
    M: MailTransport,
    C: Clock,
{
    pub fn new(link: LinkController<L, C>, modem: P, mailer: M, config: &SystemConfig) -> Self {
        Self {
            link,
            modem,
            mailer,
            smtp: config.smtp.clone(),
            low_battery_percent: config.telemetry.low_battery_percent,
            preview_res: config.camera.preview_res,
            quality: config.camera.thumbnail_quality,
        }
    }

    /// Build the mail for `request` without touching the link.
    pub fn compose(&self, request: &NotifyRequest) -> PreviewMail {
        let mut attachments = Vec::new();
        if let Some(m) = &request.mosaic {
            attachments.push(Attachment::jpeg(
                format!("{}-mosaic.jpg", request.stamp),
                m.jpeg.clone(),
            ));
        }

        let photo_name = request
            .photo
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned());

        if self.smtp.attach_photo {
            if let (Some(path), Some(name)) = (request.photo.as_deref(), photo_name.as_deref()) {
                match mosaic::preview_from_file(path, self.preview_res, self.quality) {
                    Ok(jpeg) => attachments.push(Attachment::jpeg(name, jpeg)),
                    Err(e) => warn!("NOTIFY: photo preview of {} failed: {e}", path.display()),
                }
            }
        }

        PreviewMail::compose(
            &self.smtp,
            &request.telemetry,
            self.low_battery_percent,
            photo_name.as_deref(),
            attachments,
        )
    }

    pub fn link(&self) -> &LinkController<L, C> {
        &self.link
    }

    pub fn modem(&self) -> &P {
        &self.modem
    }

    pub fn mailer(&self) -> &M {
        &self.mailer
    }

    fn power(&mut self, on: bool) {
        if let Err(e) = self.modem.set_power(on) {
            warn!("NOTIFY: modem power {}: {e}", if on { "on" } else { "off" });
        }
    }
}

impl<L, P, M, C> NotifyPort for Notifier<L, P, M, C>
where
    L: LinkPort,
    P: ModemPowerPort,
    M: MailTransport,
    C: Clock,
{
    fn deliver(&mut self, request: &NotifyRequest) -> NotifyOutcome {
        let mail = self.compose(request);

        self.power(true);
        let outcome = if self.link.connect() {
            match self.mailer.send(&mail) {
                Ok(()) => {
                    info!(
                        "NOTIFY: sent to {} with {} attachment(s)",
                        mail.to,
                        mail.attachments.len()
                    );
                    NotifyOutcome::Sent
                }
                Err(e) => {
                    error!("NOTIFY: {e}");
                    NotifyOutcome::DeliveryFailed
                }
            }
        } else {
            warn!("NOTIFY: link down, mail for {} dropped", request.stamp);
            NotifyOutcome::LinkDown
        };
        self.link.disconnect();
        self.power(false);
        outcome
    }

    fn shutdown(&mut self) {
        self.link.disconnect();
        self.power(false);
    }
}
