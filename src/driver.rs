//! Driver task owning the transport and the telemetry engine.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::DriverConfig;
use crate::engine::{DecodedMessage, TelemetryEngine};
use crate::protocol::{Command, HexDump};
use crate::retry::{RetryPolicy, connect_with_retry};
use crate::state::DeviceState;
use crate::transport::Transport;
use crate::Result;

/// A command waiting for the driver, with the channel its outcome goes to.
#[derive(Debug)]
pub struct DriverRequest {
    pub command: Command,
    pub reply: oneshot::Sender<Result<()>>,
}

/// Handles onto a running driver task.
pub struct DriverChannels {
    /// Latest device state, replaced after every notification that decoded
    pub states: watch::Receiver<Arc<DeviceState>>,
    /// Decoded messages; call `resubscribe` for an independent receiver
    pub messages: broadcast::Receiver<Arc<DecodedMessage>>,
    /// Outbound command queue
    pub commands: mpsc::Sender<DriverRequest>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
    /// The task itself
    pub task: JoinHandle<()>,
}

/// Spawns and manages the session task.
///
/// One task owns the transport and the engine and handles notifications and
/// commands one at a time, so neither needs locking.
pub struct Driver;

impl Driver {
    /// Spawn the driver for an already connected transport.
    pub fn spawn<T>(transport: T, engine: TelemetryEngine, config: &DriverConfig) -> DriverChannels
    where
        T: Transport,
    {
        let (state_tx, state_rx) = watch::channel(Arc::new(engine.snapshot()));
        let (message_tx, message_rx) = broadcast::channel(config.message_buffer);
        let (command_tx, command_rx) = mpsc::channel(config.command_queue);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(Self::session_task(
            transport,
            engine,
            state_tx,
            message_tx,
            command_rx,
            config.retry,
            cancel.clone(),
        ));

        DriverChannels {
            states: state_rx,
            messages: message_rx,
            commands: command_tx,
            cancel,
            task,
        }
    }

    async fn session_task<T>(
        mut transport: T,
        mut engine: TelemetryEngine,
        state_tx: watch::Sender<Arc<DeviceState>>,
        message_tx: broadcast::Sender<Arc<DecodedMessage>>,
        mut commands: mpsc::Receiver<DriverRequest>,
        retry: RetryPolicy,
        cancel: CancellationToken,
    ) where
        T: Transport,
    {
        info!("Session task started for {}", transport.describe());
        let mut notification_count = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Session task cancelled");
                    break;
                }
                request = commands.recv() => {
                    let Some(DriverRequest { command, reply }) = request else {
                        debug!("All session handles dropped");
                        break;
                    };

                    let frame = command.to_bytes();
                    debug!("Sending {:?}: {}", command, HexDump(&frame));

                    let outcome = match transport.write(&frame).await {
                        Err(err) if err.is_retryable() => {
                            warn!("Write failed ({}), reconnecting to resend", err);
                            match Self::reconnect(&mut transport, &mut engine, &retry, &cancel).await {
                                Ok(()) => transport.write(&frame).await,
                                Err(err) => {
                                    error!("Could not re-establish the link: {}", err);
                                    let _ = reply.send(Err(err));
                                    break;
                                }
                            }
                        }
                        outcome => outcome,
                    };

                    if reply.send(outcome).is_err() {
                        trace!("Requester went away before the reply");
                    }
                }
                result = transport.next_notification() => match result {
                    Ok(Some(bytes)) => {
                        notification_count += 1;
                        let decoded = engine.on_notification(&bytes);
                        if decoded.is_empty() {
                            continue;
                        }

                        state_tx.send_replace(Arc::new(engine.snapshot()));
                        for message in decoded {
                            // No subscribers is fine
                            let _ = message_tx.send(Arc::new(message));
                        }
                    }
                    Ok(None) => {
                        info!("{} closed the link", transport.describe());
                        break;
                    }
                    Err(err) => {
                        warn!("Notification read failed: {}", err);
                        if let Err(err) = Self::reconnect(&mut transport, &mut engine, &retry, &cancel).await {
                            error!("Could not re-establish the link: {}", err);
                            break;
                        }
                    }
                },
            }
        }

        if let Err(err) = transport.disconnect().await {
            debug!("Disconnect on shutdown failed: {}", err);
        }
        cancel.cancel();

        let stats = engine.stats();
        info!(
            "Session task ended ({} notifications, {} messages decoded, {} dropped)",
            notification_count, stats.decoded, stats.reassembly.dropped
        );
    }

    /// Tear the link down and bring it back under the retry policy.
    async fn reconnect<T>(
        transport: &mut T,
        engine: &mut TelemetryEngine,
        retry: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        T: Transport,
    {
        if let Err(err) = transport.disconnect().await {
            debug!("Disconnect before reconnect failed: {}", err);
        }
        // Fragments from the old link can never be completed
        engine.reset_link();

        connect_with_retry(transport, retry, cancel).await
    }
}
