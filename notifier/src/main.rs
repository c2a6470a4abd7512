//! Process entrypoint: wires the store, broker, adapters, and HTTP servers
//! together and runs them until a shutdown signal arrives.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use notifier_adapters::{AdapterRegistry, SmsAdapter, SmtpAdapter, TelegramAdapter};
use notifier_broker::kafka::{KafkaConsumer, KafkaProducer};
use notifier_common::{Config, DeliveryType, Signal};
use notifier_dispatcher::{Deliverer, Dispatcher};
use notifier_health::{HealthChecker, HealthConfig, HealthServer};
use notifier_metrics::MetricsConfig;
use notifier_store::{PostgresStore, Store};
use tokio::sync::broadcast;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    notifier_common::logging::init();

    let config = Config::from_env()?;
    tracing::info!(environment = %config.environment, "notifier starting");

    if let Err(e) = notifier_metrics::init_metrics(&MetricsConfig::from_env()) {
        tracing::warn!(error = %e, "failed to initialize metrics, continuing without them");
    }

    let store: Arc<dyn Store> = Arc::new(
        PostgresStore::connect(&config.store.database_dsn, config.store.pool_size).await?,
    );

    let broker_producer =
        Arc::new(KafkaProducer::connect(&config.broker, config.dispatcher.request_timeout())?);
    let broker_consumer = Arc::new(KafkaConsumer::connect(&config.broker)?);

    let adapters = Arc::new(build_adapter_registry(&config)?);

    let health_config = HealthConfig::from_env();
    let health_checker = Arc::new(HealthChecker::new(health_config.max_queue_size));
    health_checker.set_store_ready(true);
    health_checker.set_broker_ready(true);

    let (shutdown_tx, _) = broadcast::channel::<Signal>(16);

    let dispatcher = Arc::new(Dispatcher::new(store.clone(), broker_producer, &config));
    let deliverer = Arc::new(Deliverer::new(store.clone(), broker_consumer, adapters, &config));
    let queue_watcher_store = store.clone();

    let health_server = HealthServer::new(&health_config, health_checker.clone()).await?;
    let api_server = notifier_api::ApiServer::new(
        &config.http_bind,
        store,
        config.dispatcher.max_batch_size,
        config.dispatcher.request_timeout(),
    )
    .await?;

    let shutting_down = Arc::new(AtomicBool::new(false));

    let result = tokio::select! {
        r = dispatcher.serve(shutdown_tx.subscribe()) => {
            tracing::warn!("dispatcher exited");
            Ok(r)
        }
        r = deliverer.serve(shutdown_tx.subscribe()) => {
            tracing::warn!("deliverer exited");
            Ok(r)
        }
        r = health_server.serve(shutdown_tx.subscribe()) => {
            r.map_err(anyhow::Error::from)
        }
        r = api_server.serve(shutdown_tx.subscribe()) => {
            r.map_err(anyhow::Error::from)
        }
        () = watch_queue_size(queue_watcher_store, health_checker, config.dispatcher.producer_tick(), shutdown_tx.subscribe()) => {
            tracing::warn!("queue watcher exited");
            Ok(())
        }
        () = await_termination() => {
            shutting_down.store(true, Ordering::SeqCst);
            tracing::info!("shutdown signal received");
            let _ = shutdown_tx.send(Signal::Shutdown);
            Ok(())
        }
    };

    if !shutting_down.load(Ordering::SeqCst) {
        let _ = shutdown_tx.send(Signal::Shutdown);
    }

    tracing::info!("notifier shutting down");
    result
}

/// Waits for either Ctrl+C or SIGTERM, whichever arrives first.
async fn await_termination() {
    #[cfg(unix)]
    {
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Periodically reports the pending-queue depth to the health checker, so
/// `/readyz` can fail on backlog rather than only on dependency connectivity.
async fn watch_queue_size(
    store: Arc<dyn Store>,
    health_checker: Arc<HealthChecker>,
    interval: std::time::Duration,
    mut shutdown: broadcast::Receiver<Signal>,
) {
    let mut timer = tokio::time::interval(interval);
    timer.tick().await;

    loop {
        tokio::select! {
            _ = timer.tick() => {
                match store.get_pending(usize::MAX).await {
                    Ok(pending) => health_checker.set_queue_size(pending.len() as u64),
                    Err(e) => tracing::warn!(error = %e, "failed to read pending queue depth"),
                }
            }
            sig = shutdown.recv() => {
                match sig {
                    Ok(Signal::Shutdown | Signal::Finalised) | Err(_) => break,
                }
            }
        }
    }
}

fn build_adapter_registry(config: &Config) -> anyhow::Result<AdapterRegistry> {
    let mut registry = AdapterRegistry::new();

    if let Some(smtp) = &config.smtp {
        registry = registry.with(DeliveryType::Email, Arc::new(SmtpAdapter::new(smtp)?));
    } else {
        tracing::warn!("SMTP not configured, email notifications will fail delivery");
    }

    if let Some(sms) = &config.sms {
        registry = registry.with(
            DeliveryType::Sms,
            Arc::new(SmsAdapter::new(
                sms.gateway_url.clone(),
                sms.api_key.clone(),
                sms.sender_id.clone(),
            )),
        );
    } else {
        tracing::warn!("SMS gateway not configured, sms notifications will fail delivery");
    }

    if let Some(telegram) = &config.telegram {
        registry = registry.with(DeliveryType::Telegram, Arc::new(TelegramAdapter::new(&telegram.bot_token)));
    } else {
        tracing::warn!("Telegram bot not configured, telegram notifications will fail delivery");
    }

    Ok(registry)
}
