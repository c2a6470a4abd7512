//! SMTP-backed email adapter.

use async_trait::async_trait;
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};
use notifier_common::{AdapterError, Notification, SmtpConfig};

use crate::Adapter;

/// Delivers `Email`-typed notifications over SMTP via `lettre`.
pub struct SmtpAdapter {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpAdapter {
    /// Builds a transport against `config.host`, authenticated with the
    /// configured credentials over implicit TLS.
    ///
    /// # Errors
    /// Returns [`AdapterError::Send`] if the transport or sender address
    /// cannot be constructed (this surfaces at startup, not per-message).
    pub fn new(config: &SmtpConfig) -> Result<Self, AdapterError> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| AdapterError::Send(e.into()))?
            .port(config.port)
            .credentials(creds)
            .build();

        let from = config
            .from_address
            .parse()
            .map_err(|e: lettre::address::AddressError| AdapterError::Send(e.into()))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Adapter for SmtpAdapter {
    async fn send(&self, notification: &Notification) -> Result<(), AdapterError> {
        let to: Mailbox = notification
            .recipient
            .parse()
            .map_err(|e: lettre::address::AddressError| AdapterError::Send(e.into()))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(format!("Notification {}", notification.id))
            .body(notification.content.clone())
            .map_err(|e| AdapterError::Send(e.into()))?;

        self.transport
            .send(email)
            .await
            .map(|_| ())
            .map_err(|e| AdapterError::Send(e.into()))
    }
}
