//! Scooter session handle.

use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DriverConfig;
use crate::driver::{Driver, DriverRequest};
use crate::engine::{DecodedMessage, MessageHandler, TelemetryEngine};
use crate::protocol::{Attribute, Command};
use crate::retry::connect_with_retry;
use crate::state::DeviceState;
use crate::stream::ThrottleExt;
use crate::transport::Transport;
use crate::types::UpdateRate;
use crate::{Result, ScooterError};


/// Configures and opens a [`ScooterConnection`].
pub struct ScooterBuilder<T> {
    transport: T,
    config: DriverConfig,
    handler: Option<Box<dyn MessageHandler>>,
}

impl<T: Transport> ScooterBuilder<T> {
    pub fn new(transport: T) -> Self {
        Self { transport, config: DriverConfig::default(), handler: None }
    }

    pub fn config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    /// Called on the session task for every decoded message, after the
    /// state has been updated.
    pub fn on_message(mut self, handler: impl MessageHandler + 'static) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Connect the transport under the retry policy and start the session.
    pub async fn connect(self) -> Result<ScooterConnection> {
        self.config.validate()?;

        let mut transport = self.transport;
        info!("Connecting to {}", transport.describe());
        connect_with_retry(&mut transport, &self.config.retry, &CancellationToken::new()).await?;

        let mut engine = TelemetryEngine::with_max_pending(self.config.max_pending_fragments);
        engine.set_handler(self.handler);

        let channels = Driver::spawn(transport, engine, &self.config);
        info!("Scooter session opened");

        Ok(ScooterConnection {
            states: channels.states,
            messages: channels.messages,
            commands: channels.commands,
            cancel: channels.cancel,
            task: Some(channels.task),
        })
    }
}

/// A running session with one scooter.
///
/// Dropping the handle stops the session.
pub struct ScooterConnection {
    /// Latest device state
    states: watch::Receiver<Arc<DeviceState>>,

    /// Template receiver for message subscriptions
    messages: broadcast::Receiver<Arc<DecodedMessage>>,

    /// Command queue into the session task
    commands: mpsc::Sender<DriverRequest>,

    /// Cancellation token for stopping the task
    cancel: CancellationToken,

    task: Option<JoinHandle<()>>,
}

impl ScooterConnection {
    /// Connect with the default configuration.
    pub async fn connect<T: Transport>(transport: T) -> Result<Self> {
        ScooterBuilder::new(transport).connect().await
    }

    pub fn builder<T: Transport>(transport: T) -> ScooterBuilder<T> {
        ScooterBuilder::new(transport)
    }

    /// Snapshot of the last-known device state.
    pub fn current_state(&self) -> DeviceState {
        DeviceState::clone(&self.states.borrow())
    }

    /// Device state after every change, starting with the current one.
    ///
    /// With [`UpdateRate::Max`] intermediate states are skipped so that at
    /// most `hz` states per second are delivered, always the latest. The
    /// stream ends when the session stops.
    pub fn state_updates(&self, rate: UpdateRate) -> impl Stream<Item = Arc<DeviceState>> + 'static {
        let states = WatchStream::new(self.states.clone());

        match rate.throttle_interval() {
            None => states.boxed(),
            Some(interval) => states.throttle(interval).boxed(),
        }
    }

    /// Every decoded message from now on. A subscriber that falls behind
    /// skips the messages it missed.
    pub fn messages(&self) -> impl Stream<Item = Arc<DecodedMessage>> + 'static {
        BroadcastStream::new(self.messages.resubscribe()).filter_map(|result| async move {
            match result {
                Ok(message) => Some(message),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!("Message subscriber lagged, skipped {} messages", skipped);
                    None
                }
            }
        })
    }

    /// Queue a command and wait until it was written.
    ///
    /// A failed write re-establishes the link and is attempted once more
    /// before the error is returned.
    pub async fn request(&self, command: Command) -> Result<()> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(DriverRequest { command, reply })
            .await
            .map_err(|_| ScooterError::Shutdown)?;
        outcome.await.map_err(|_| ScooterError::Shutdown)?
    }

    /// Ask the scooter to report `attribute`. The answer arrives as a
    /// notification and updates the state.
    pub async fn request_attribute(&self, attribute: Attribute) -> Result<()> {
        self.request(Command::Read(attribute)).await
    }

    pub async fn set_tail_light(&self, on: bool) -> Result<()> {
        self.request(Command::TailLight(on)).await
    }

    pub async fn set_cruise(&self, on: bool) -> Result<()> {
        self.request(Command::Cruise(on)).await
    }

    /// Request `attribute` and wait for the matching message.
    pub async fn query(&self, attribute: Attribute, timeout: Duration) -> Result<Arc<DecodedMessage>> {
        // Subscribe first so a fast answer is not missed
        let mut messages = self.messages.resubscribe();
        self.request_attribute(attribute).await?;

        let answer = async {
            loop {
                match messages.recv().await {
                    Ok(message) if message.message.attribute() == Some(attribute) => return Ok(message),
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Skipped {} messages while waiting for {}", skipped, attribute);
                    }
                    Err(broadcast::error::RecvError::Closed) => return Err(ScooterError::Shutdown),
                }
            }
        };

        tokio::time::timeout(timeout, answer)
            .await
            .map_err(|_| ScooterError::Timeout { duration: timeout })?
    }

    /// Whether the session task has stopped.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop the session and wait for the task to disconnect the transport.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!("Session task failed: {}", err);
            }
        }
        info!("Scooter session closed");
    }
}

impl Drop for ScooterConnection {
    fn drop(&mut self) {
        debug!("Dropping scooter connection");
        self.cancel.cancel();
    }
}
