//! Session broker.
//!
//! Owns the transport, the command correlator and the handler registry, and
//! runs two background tasks once connected:
//!
//! - the receive loop pulls frames from the transport, classifies them and
//!   either completes a pending command or queues a decoded event
//! - the dispatcher drains the event queue and invokes handlers
//!
//! Callers issue commands concurrently through [`Broker::execute`]; each one
//! suspends on its own waiter until the reply, its timeout, or shutdown.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::CommandId;
use crate::options::{BiDiOptions, CommandOptions, saturating_millis};
use crate::protocol::envelope::{self, Envelope};
use crate::protocol::{Command, CommandFrame, EventArgs};
use crate::session::SubscribeCommand;
use crate::subscription::{Subscription, SubscriptionOptions};
use crate::transport::Transport;

use super::correlator::Correlator;
use super::dispatcher::{self, EventSender, QueuedEvent};
use super::registry::{HandlerFn, HandlerId, HandlerRegistry, async_handler, sync_handler};

// ============================================================================
// Types
// ============================================================================

/// Handles to the background tasks of a connected broker.
struct BackgroundTasks {
    /// Dropping or signalling stops the receive loop.
    shutdown: watch::Sender<bool>,
    receiver: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
}

/// Shared broker state.
pub(crate) struct BrokerInner {
    transport: Arc<dyn Transport>,
    correlator: Arc<Correlator>,
    registry: Arc<HandlerRegistry>,
    options: BiDiOptions,
    tasks: Mutex<Option<BackgroundTasks>>,
    connected: AtomicBool,
    closed: AtomicBool,
}

// ============================================================================
// Broker
// ============================================================================

/// Multiplexes commands and events over one transport.
///
/// Cloning is cheap; clones share the same connection.
///
/// # Example
///
/// ```ignore
/// let (transport, peer) = MemoryTransport::pair();
/// let broker = Broker::new(Arc::new(transport), BiDiOptions::default());
/// broker.connect(&Url::parse("ws://localhost:9222/session")?).await?;
///
/// let status = broker.execute(&StatusCommand {}).await?;
/// broker.close().await;
/// ```
#[derive(Clone)]
pub struct Broker {
    inner: Arc<BrokerInner>,
}

impl Broker {
    /// Creates an unconnected broker over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, options: BiDiOptions) -> Self {
        let correlator = Arc::new(Correlator::new(options.max_pending_commands));
        Self {
            inner: Arc::new(BrokerInner {
                transport,
                correlator,
                registry: Arc::new(HandlerRegistry::default()),
                options,
                tasks: Mutex::new(None),
                connected: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
        }
    }

    #[inline]
    pub(crate) fn from_inner(inner: Arc<BrokerInner>) -> Self {
        Self { inner }
    }

    /// Returns the options this broker was created with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &BiDiOptions {
        &self.inner.options
    }

    /// Returns the number of commands awaiting a reply.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.correlator.pending_count()
    }

    /// Returns `true` while the receive loop is running.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        if !self.inner.connected.load(Ordering::Acquire) || self.is_closed() {
            return false;
        }
        self.inner
            .tasks
            .lock()
            .as_ref()
            .is_some_and(|tasks| !tasks.receiver.is_finished())
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

// ============================================================================
// Broker - Lifecycle
// ============================================================================

impl Broker {
    /// Connects the transport and starts the background tasks.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the broker was closed
    /// - [`Error::Connection`] if already connected or the endpoint refuses
    /// - [`Error::ConnectionTimeout`] if the handshake times out
    pub async fn connect(&self, endpoint: &Url) -> Result<()> {
        let inner = &self.inner;
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        if inner.connected.swap(true, Ordering::AcqRel) {
            return Err(Error::connection("broker is already connected"));
        }

        if let Err(e) = inner.transport.connect(endpoint).await {
            inner.connected.store(false, Ordering::Release);
            return Err(e);
        }

        // `close` marks the broker before taking the tasks, so checking under
        // the tasks lock cannot miss a close that ran during the handshake.
        let started = {
            let mut tasks = inner.tasks.lock();
            if self.is_closed() {
                false
            } else {
                *tasks = Some(self.start_tasks());
                true
            }
        };
        if !started {
            debug!(%endpoint, "Broker closed during connect");
            inner.transport.close().await;
            return Err(Error::ConnectionClosed);
        }

        info!(%endpoint, "Broker connected");
        Ok(())
    }

    fn start_tasks(&self) -> BackgroundTasks {
        let inner = &self.inner;
        let (events_tx, events_rx) = dispatcher::queue();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let dispatcher = dispatcher::spawn(Arc::clone(&inner.registry), events_rx);
        let receive_loop = ReceiveLoop {
            transport: Arc::clone(&inner.transport),
            correlator: Arc::clone(&inner.correlator),
            registry: Arc::clone(&inner.registry),
            events: events_tx,
        };
        let receiver = tokio::spawn(receive_loop.run(shutdown_rx));

        BackgroundTasks {
            shutdown: shutdown_tx,
            receiver,
            dispatcher,
        }
    }

    /// Shuts the broker down.
    ///
    /// Stops the receive loop, fails every pending command with
    /// [`Error::ConnectionClosed`], waits for events already queued to be
    /// dispatched, then closes the transport. Calling it again is a no-op.
    ///
    /// Must not be awaited from inside an event handler, since it waits for
    /// the dispatcher to finish.
    pub async fn close(&self) {
        let inner = &self.inner;
        if inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let tasks = inner.tasks.lock().take();
        if let Some(BackgroundTasks {
            shutdown,
            receiver,
            dispatcher,
        }) = tasks
        {
            let _ = shutdown.send(true);
            if let Err(e) = receiver.await {
                error!(error = %e, "Receive loop task failed");
            }

            inner.correlator.fail_all();

            if let Err(e) = dispatcher.await {
                error!(error = %e, "Dispatcher task failed");
            }
        } else {
            inner.correlator.fail_all();
        }

        inner.transport.close().await;
        info!("Broker closed");
    }
}

// ============================================================================
// Broker - Commands
// ============================================================================

impl Broker {
    /// Sends a command and waits for its typed result, using the default
    /// command timeout.
    ///
    /// # Errors
    ///
    /// See [`execute_with`](Self::execute_with).
    pub async fn execute<C: Command>(&self, command: &C) -> Result<C::Output> {
        self.execute_with(command, CommandOptions::default()).await
    }

    /// Sends a command and waits for its typed result.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] before [`connect`](Self::connect)
    /// - [`Error::ConnectionClosed`] if the connection closes before the reply
    /// - [`Error::Protocol`] if too many commands are pending
    /// - [`Error::Remote`] if the remote end replies with an error
    /// - [`Error::CommandTimeout`] if no reply arrives in time
    /// - [`Error::Json`] if the result does not decode into `C::Output`
    pub async fn execute_with<C: Command>(
        &self,
        command: &C,
        options: CommandOptions,
    ) -> Result<C::Output> {
        let inner = &self.inner;
        if !inner.connected.load(Ordering::Acquire) {
            return Err(Error::NotConnected);
        }

        let method = command.method();
        let (id, reply) = inner.correlator.register::<C::Output>(method)?;
        let _guard = PendingGuard {
            correlator: inner.correlator.as_ref(),
            id,
        };

        let message = serde_json::to_string(&CommandFrame::new(id, command))?;
        let command_timeout = options.timeout.unwrap_or(inner.options.command_timeout);

        let exchange = async {
            inner.transport.send(message).await?;
            reply.await.map_err(|_| Error::ConnectionClosed)?
        };

        match timeout(command_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                debug!(%id, %method, "Command timed out");
                Err(Error::command_timeout(
                    id,
                    method,
                    saturating_millis(command_timeout),
                ))
            }
        }
    }
}

/// Removes a command from the correlator when its caller stops waiting.
///
/// A no-op if the command already reached a terminal state.
struct PendingGuard<'a> {
    correlator: &'a Correlator,
    id: CommandId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.correlator.cancel(self.id);
    }
}

// ============================================================================
// Broker - Subscriptions
// ============================================================================

impl Broker {
    /// Subscribes a synchronous handler to `method`.
    ///
    /// The remote subscription is confirmed before the handler is added, so
    /// a failed subscribe leaves nothing registered locally.
    ///
    /// # Errors
    ///
    /// Any error from `session.subscribe`.
    pub async fn subscribe<E, F>(
        &self,
        method: &str,
        handler: F,
        options: SubscriptionOptions,
    ) -> Result<Subscription>
    where
        E: EventArgs,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe_handler::<E>(method, sync_handler(handler), options)
            .await
    }

    /// Subscribes an asynchronous handler to `method`.
    ///
    /// The handler receives its own copy of each event and may issue
    /// commands on this broker.
    ///
    /// # Errors
    ///
    /// Any error from `session.subscribe`.
    pub async fn subscribe_async<E, F, Fut>(
        &self,
        method: &str,
        handler: F,
        options: SubscriptionOptions,
    ) -> Result<Subscription>
    where
        E: EventArgs,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.subscribe_handler::<E>(method, async_handler(handler), options)
            .await
    }

    /// Removes a subscription. Equivalent to [`Subscription::unsubscribe`].
    ///
    /// # Errors
    ///
    /// Any error from `session.unsubscribe`.
    pub async fn unsubscribe(&self, subscription: Subscription) -> Result<()> {
        subscription.unsubscribe().await
    }

    async fn subscribe_handler<E: EventArgs>(
        &self,
        method: &str,
        callback: HandlerFn,
        options: SubscriptionOptions,
    ) -> Result<Subscription> {
        let SubscriptionOptions {
            contexts,
            user_contexts,
            timeout,
        } = options;

        let command = SubscribeCommand::new([method])
            .with_contexts(contexts.clone())
            .with_user_contexts(user_contexts);
        let result = self.execute_with(&command, CommandOptions { timeout }).await?;

        let handler_id = self.inner.registry.add::<E>(method, Some(contexts), callback);

        debug!(subscription = %result.subscription, %method, "Subscribed");
        Ok(Subscription::new(
            result.subscription,
            method,
            handler_id,
            Arc::downgrade(&self.inner),
        ))
    }

    pub(crate) fn remove_handler(&self, method: &str, handler_id: HandlerId) -> bool {
        self.inner.registry.remove(method, handler_id)
    }

    /// Returns the number of local handlers for `method`.
    #[must_use]
    pub fn handler_count(&self, method: &str) -> usize {
        self.inner.registry.handler_count(method)
    }
}

// ============================================================================
// ReceiveLoop
// ============================================================================

/// State owned by the receive loop task.
struct ReceiveLoop {
    transport: Arc<dyn Transport>,
    correlator: Arc<Correlator>,
    registry: Arc<HandlerRegistry>,
    /// Dropped when the loop exits, which lets the dispatcher drain and stop.
    events: EventSender,
}

impl ReceiveLoop {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        debug!("Receive loop started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => {
                    debug!("Receive loop shutting down");
                    break;
                }

                frame = self.transport.receive() => {
                    match frame {
                        Ok(frame) => self.process_frame(&frame),

                        Err(Error::ConnectionClosed) => {
                            debug!("Connection closed by remote");
                            self.correlator.fail_all();
                            break;
                        }

                        Err(e) => {
                            error!(error = %e, "Transport receive failed");
                            self.correlator.fail_all();
                            break;
                        }
                    }
                }
            }
        }

        debug!("Receive loop terminated");
    }

    /// Routes one inbound frame. Never fails; bad frames are logged.
    fn process_frame(&self, frame: &[u8]) {
        let envelope = match envelope::decode(frame) {
            Ok(Some(envelope)) => envelope,
            Ok(None) => {
                trace!("Ignoring message of unknown type");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Discarding malformed message");
                return;
            }
        };

        match envelope {
            Envelope::Success { id, result } => {
                if !self.correlator.resolve(id, result) {
                    warn!(%id, "Reply for unknown command");
                }
            }

            Envelope::Error { id, error, message } => {
                if !self.correlator.reject(id, error, message) {
                    warn!(%id, "Error reply for unknown command");
                }
            }

            Envelope::Event { method, params } => {
                let decoders = self.registry.decoders(&method);
                if decoders.is_empty() {
                    warn!(%method, "No handler subscribed to event, dropping");
                    return;
                }

                let decoded: Vec<_> = decoders
                    .into_iter()
                    .filter_map(|decode| match decode(params) {
                        Ok(event) => Some(event),
                        Err(e) => {
                            warn!(%method, error = %e, "Failed to decode event payload");
                            None
                        }
                    })
                    .collect();
                if decoded.is_empty() {
                    return;
                }

                let queued = QueuedEvent {
                    method: method.into_owned(),
                    decoded,
                };
                if self.events.send(queued).is_err() {
                    debug!("Event queue closed, dropping event");
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
