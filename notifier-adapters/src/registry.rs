//! Maps each [`DeliveryType`] to its concrete [`Adapter`].

use std::{collections::HashMap, sync::Arc};

use notifier_common::{AdapterError, DeliveryType, Notification};

use crate::Adapter;

/// An explicit, startup-built dispatch table from delivery type to sink.
///
/// There is no runtime reflection or plugin discovery: every adapter the
/// process can reach is registered once, here, when the process starts.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<DeliveryType, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, delivery_type: DeliveryType, adapter: Arc<dyn Adapter>) -> Self {
        self.adapters.insert(delivery_type, adapter);
        self
    }

    /// Dispatches a single delivery attempt to the adapter registered for
    /// `notification`'s delivery type.
    ///
    /// # Errors
    /// Returns [`AdapterError::UnknownDeliveryType`] if no adapter is
    /// registered, or whatever error the adapter itself returns.
    pub async fn send(&self, notification: &Notification) -> Result<(), AdapterError> {
        let adapter = self.adapters.get(&notification.delivery_type).ok_or_else(|| {
            AdapterError::UnknownDeliveryType(notification.delivery_type.to_string())
        })?;
        adapter.send(notification).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use notifier_common::NotificationStatus;
    use uuid::Uuid;

    use super::*;

    struct AlwaysOk;

    #[async_trait]
    impl Adapter for AlwaysOk {
        async fn send(&self, _notification: &Notification) -> Result<(), AdapterError> {
            Ok(())
        }
    }

    fn sample(delivery_type: DeliveryType) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            delivery_type,
            recipient: "someone".to_string(),
            content: "hi".to_string(),
            status: NotificationStatus::InQueue,
            retries: 0,
            created_at: chrono::Utc::now(),
            sent_at: None,
        }
    }

    #[tokio::test]
    async fn dispatches_to_registered_adapter() {
        let registry = AdapterRegistry::new().with(DeliveryType::Email, Arc::new(AlwaysOk));
        let result = registry.send(&sample(DeliveryType::Email)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn unregistered_delivery_type_errors() {
        let registry = AdapterRegistry::new();
        let result = registry.send(&sample(DeliveryType::Sms)).await;
        assert!(matches!(result, Err(AdapterError::UnknownDeliveryType(_))));
    }
}
