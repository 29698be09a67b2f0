//! SMTP mail adapter (lettre).
//!
//! Best-effort delivery: STARTTLS is opportunistic, a TLS setup failure
//! is logged and the mail goes out in clear, and a permanent refusal with
//! credentials is retried once without them.

use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};
use log::{debug, warn};

use crate::app::ports::MailTransport;
use crate::config::SmtpConfig;
use crate::error::DeliveryError;
use crate::notify::mail::PreviewMail;

pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn credentials(&self) -> Option<Credentials> {
        match (&self.config.username, &self.config.password) {
            (Some(user), Some(pass)) => Some(Credentials::new(user.clone(), pass.clone())),
            _ => None,
        }
    }

    fn transport(&self, credentials: Option<Credentials>) -> SmtpTransport {
        let cfg = &self.config;
        let mut builder = SmtpTransport::builder_dangerous(&cfg.server)
            .port(cfg.port)
            .timeout(Some(Duration::from_secs(u64::from(cfg.timeout_secs))));
        if cfg.starttls {
            match TlsParameters::new(cfg.server.clone()) {
                Ok(params) => builder = builder.tls(Tls::Opportunistic(params)),
                Err(e) => warn!("SMTP: TLS setup failed, sending in clear: {e}"),
            }
        }
        if let Some(creds) = credentials {
            builder = builder.credentials(creds);
        }
        builder.build()
    }
}

fn mailbox(addr: &str) -> Result<Mailbox, DeliveryError> {
    addr.parse().map_err(|_| DeliveryError::Address(addr.to_owned()))
}

/// Build the MIME message: plain-text body then one part per attachment.
pub fn build_message(mail: &PreviewMail) -> Result<Message, DeliveryError> {
    let mut body = MultiPart::mixed().singlepart(SinglePart::plain(mail.body.clone()));
    for a in &mail.attachments {
        let content_type =
            ContentType::parse(a.content_type).map_err(|e| DeliveryError::Build(e.to_string()))?;
        body = body.singlepart(Attachment::new(a.filename.clone()).body(a.data.clone(), content_type));
    }
    Message::builder()
        .from(mailbox(&mail.from)?)
        .to(mailbox(&mail.to)?)
        .subject(mail.subject.clone())
        .multipart(body)
        .map_err(|e| DeliveryError::Build(e.to_string()))
}

impl MailTransport for SmtpMailer {
    fn send(&mut self, mail: &PreviewMail) -> Result<(), DeliveryError> {
        let message = build_message(mail)?;
        let credentials = self.credentials();
        let authenticated = credentials.is_some();

        match self.transport(credentials).send(&message) {
            Ok(response) => {
                debug!("SMTP: {:?}", response.code());
                Ok(())
            }
            Err(e) if authenticated && e.is_permanent() => {
                warn!("SMTP: refused with credentials ({e}), retrying without");
                self.transport(None)
                    .send(&message)
                    .map(|_| ())
                    .map_err(|e| DeliveryError::Relay(e.to_string()))
            }
            Err(e) => Err(DeliveryError::Relay(e.to_string())),
        }
    }
}
