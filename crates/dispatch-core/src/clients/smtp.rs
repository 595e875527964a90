//! SMTP delivery client

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use log::debug;
use uuid::Uuid;

use super::traits::DeliveryProvider;
use crate::error::{DispatchError, Result};
use crate::types::{DeliveryReceipt, OutboundMessage, SmtpSettings};

pub struct SmtpDeliveryClient {
    host: String,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpDeliveryClient {
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let credentials = Credentials::new(settings.username.clone(), settings.password.clone());

        let mailer = if settings.tls {
            let tls_params = TlsParameters::new(settings.host.clone()).map_err(smtp_error)?;
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(smtp_error)?
                .port(settings.port)
                .credentials(credentials)
                .tls(Tls::Required(tls_params))
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
                .port(settings.port)
                .credentials(credentials)
                .build()
        };

        Ok(Self {
            host: settings.host.clone(),
            mailer,
        })
    }

    fn build_message(message: &OutboundMessage) -> Result<Message> {
        let from: Mailbox = message
            .from
            .parse()
            .map_err(|e| DispatchError::Delivery(format!("Invalid from address: {}", e)))?;
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| DispatchError::Delivery(format!("Invalid recipient address: {}", e)))?;

        let builder = Message::builder().from(from).to(to).subject(&message.subject);

        let built = match (&message.html, &message.text) {
            (Some(html), Some(text)) => {
                builder.multipart(MultiPart::alternative_plain_html(text.clone(), html.clone()))
            }
            (Some(html), None) => builder.header(ContentType::TEXT_HTML).body(html.clone()),
            (None, text) => builder
                .header(ContentType::TEXT_PLAIN)
                .body(text.clone().unwrap_or_default()),
        };

        built.map_err(smtp_error)
    }
}

fn smtp_error(err: impl std::fmt::Display) -> DispatchError {
    DispatchError::Delivery(format!("SMTP: {}", err))
}

#[async_trait]
impl DeliveryProvider for SmtpDeliveryClient {
    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt> {
        let email = Self::build_message(message)?;
        debug!("Relaying message for {} through {}", message.to, self.host);

        let response = self.mailer.send(email).await.map_err(smtp_error)?;

        let id = response
            .message()
            .next()
            .map(|line| line.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(DeliveryReceipt { id })
    }

    fn name(&self) -> String {
        format!("smtp:{}", self.host)
    }
}
