//! One running bus: its tasks, shared state and client gateway.
//!
//! Instances are independent. A daemon serving several buses starts one
//! [`BusInstance`] per bus; nothing is shared between them.

use std::sync::Arc;

use ipmb_core::{BusConfig, BusTransport, BusWriter, CommandHandler, SequenceTable};
use tokio::{net::UnixListener, sync::mpsc, task::JoinHandle};
use tracing::{error, info};

use crate::{collector, error::ServerError, gateway::Gateway, receiver, request_server};

/// A started bus instance.
///
/// Dropping the instance aborts its tasks.
#[derive(Debug)]
pub struct BusInstance {
    config: Arc<BusConfig>,
    sequences: Arc<SequenceTable>,
    gateway: Gateway,
    tasks: Vec<JoinHandle<()>>,
}

impl BusInstance {
    /// Open both halves of the bus through `transport` and start the
    /// receiver, request server and response collector.
    ///
    /// Client connections are not accepted until [`Self::serve_clients`].
    ///
    /// # Errors
    ///
    /// `Transport` if either bus handle cannot be opened.
    pub async fn start<T: BusTransport>(
        transport: &T,
        handler: impl CommandHandler,
        config: BusConfig,
    ) -> Result<Self, ServerError> {
        let bus = config.bus_id;

        let reader = transport
            .open_slave(bus)
            .await
            .map_err(|source| ServerError::Transport { bus, role: "slave", source })?;
        let writer = transport
            .open_master(bus)
            .await
            .map_err(|source| ServerError::Transport { bus, role: "master", source })?;

        let config = Arc::new(config);
        let sequences = Arc::new(SequenceTable::with_capacity(config.sequence_slots));
        let writer = Arc::new(BusWriter::new(writer, config.write_retries, config.retry_delay));
        let handler: Arc<dyn CommandHandler> = Arc::new(handler);

        let depth = config.queue_depth.max(1);
        let (request_tx, request_rx) = mpsc::channel(depth);
        let (response_tx, response_rx) = mpsc::channel(depth);

        let tasks = vec![
            tokio::spawn(receiver::run(reader, request_tx, response_tx, Arc::clone(&config))),
            tokio::spawn(request_server::run(
                request_rx,
                handler,
                Arc::clone(&writer),
                Arc::clone(&config),
            )),
            tokio::spawn(collector::run(response_rx, Arc::clone(&sequences))),
        ];

        let gateway = Gateway::new(Arc::clone(&sequences), writer, Arc::clone(&config));

        info!(
            bus,
            local_addr = %format!("{:#04x}", config.local_addr),
            payload_id = config.payload_id,
            restricted = config.restricted,
            "bus instance started"
        );

        Ok(Self { config, sequences, gateway, tasks })
    }

    /// Client gateway for this bus.
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Sequence table shared by the gateway and the response collector.
    pub fn sequences(&self) -> &Arc<SequenceTable> {
        &self.sequences
    }

    /// Configuration the instance was started with.
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Start accepting client connections on `listener`.
    pub fn serve_clients(&mut self, listener: UnixListener) {
        let bus = self.config.bus_id;
        let gateway = self.gateway.clone();
        self.tasks.push(tokio::spawn(async move {
            if let Err(e) = gateway.serve(listener).await {
                error!(bus, error = %e, "client gateway stopped");
            }
        }));
    }

    /// Stop every task and wait for them to finish.
    pub async fn shutdown(mut self) {
        let tasks = std::mem::take(&mut self.tasks);
        for task in &tasks {
            task.abort();
        }
        for task in tasks {
            let _ = task.await;
        }
        info!(bus = self.config.bus_id, "bus instance stopped");
    }
}

impl Drop for BusInstance {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
