use crate::monitor::OrchestratorMonitor;
use crate::registry::AgentRegistry;
use aise_agent::Outbox;
use aise_core::{AiseError, AiseResult, Message};
use async_trait::async_trait;
use futures_util::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Notify, OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

struct Envelope {
    message: Message,
    /// Capacity slot held while queued; `None` for router responses.
    _permit: Option<OwnedSemaphorePermit>,
}

/// Global FIFO of messages awaiting delivery.
///
/// External sends are bounded by the configured capacity. Responses
/// re-enqueued by the router bypass the bound so the single consumer never
/// waits on itself.
pub struct MessageQueue {
    items: Mutex<VecDeque<Envelope>>,
    available: Notify,
    capacity: Arc<Semaphore>,
    unfinished: watch::Sender<usize>,
    closed: AtomicBool,
}

impl MessageQueue {
    /// A queue accepting up to `capacity` external sends.
    pub fn new(capacity: usize) -> Self {
        let (unfinished, _) = watch::channel(0);
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Notify::new(),
            capacity: Arc::new(Semaphore::new(capacity)),
            unfinished,
            closed: AtomicBool::new(false),
        }
    }

    fn push(&self, envelope: Envelope) {
        self.unfinished.send_modify(|n| *n += 1);
        self.items.lock().push_back(envelope);
        self.available.notify_one();
    }

    fn closed_error() -> AiseError {
        AiseError::Router("message queue is closed".into())
    }

    /// Append to the tail, waiting for capacity.
    pub async fn send(&self, message: Message) -> AiseResult<()> {
        if self.is_closed() {
            return Err(Self::closed_error());
        }
        let permit = self
            .capacity
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Self::closed_error())?;
        debug!(
            message_id = %message.id(),
            message_type = %message.kind(),
            from = %message.sender(),
            to = %message.receiver(),
            "Message enqueued"
        );
        self.push(Envelope {
            message,
            _permit: Some(permit),
        });
        Ok(())
    }

    /// Append to the tail without waiting; fails when full or closed.
    pub fn try_send(&self, message: Message) -> AiseResult<()> {
        let permit = self
            .capacity
            .clone()
            .try_acquire_owned()
            .map_err(|e| match e {
                TryAcquireError::Closed => Self::closed_error(),
                TryAcquireError::NoPermits => AiseError::Router("message queue is full".into()),
            })?;
        self.push(Envelope {
            message,
            _permit: Some(permit),
        });
        Ok(())
    }

    /// Append a router response. Ignores both the bound and `close`.
    pub fn requeue(&self, message: Message) {
        self.push(Envelope {
            message,
            _permit: None,
        });
    }

    /// Pop the head, if any.
    pub fn pop(&self) -> Option<Message> {
        self.items.lock().pop_front().map(|e| e.message)
    }

    /// Wait for and pop the head.
    pub async fn recv(&self) -> Message {
        loop {
            let notified = self.available.notified();
            if let Some(message) = self.pop() {
                return message;
            }
            notified.await;
        }
    }

    /// Mark one popped message as handled.
    pub fn task_done(&self) {
        self.unfinished.send_modify(|n| *n = n.saturating_sub(1));
    }

    /// Resolve once every enqueued message has been marked done.
    pub async fn join(&self) {
        let mut unfinished = self.unfinished.subscribe();
        // The sender lives in `self`, so this can't observe a closed channel.
        let _ = unfinished.wait_for(|n| *n == 0).await;
    }

    /// Stop accepting external sends. Queued messages stay deliverable.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.capacity.close();
            info!(queued = self.len(), "Message queue closed");
        }
    }

    /// Whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Messages waiting for delivery.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Whether no message is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Messages enqueued but not yet marked done.
    pub fn unfinished(&self) -> usize {
        *self.unfinished.borrow()
    }
}

#[async_trait]
impl Outbox for MessageQueue {
    async fn send(&self, message: Message) -> AiseResult<()> {
        MessageQueue::send(self, message).await
    }
}

/// What happened to one dispatched message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Handled by the receiver with no response.
    Delivered,
    /// Handled, and the response was re-enqueued.
    Responded,
    /// No agent is registered under the receiver id.
    Dropped,
    /// The receiver panicked while handling it.
    Failed,
}

/// Delivers queued messages to their receivers.
#[derive(Clone)]
pub struct MessageRouter {
    queue: Arc<MessageQueue>,
    agents: Arc<AgentRegistry>,
    monitor: Arc<OrchestratorMonitor>,
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl MessageRouter {
    /// A router over `queue`, delivering to agents in `agents`.
    pub fn new(
        queue: Arc<MessageQueue>,
        agents: Arc<AgentRegistry>,
        monitor: Arc<OrchestratorMonitor>,
    ) -> Self {
        Self {
            queue,
            agents,
            monitor,
        }
    }

    async fn deliver(&self, message: Message) -> Dispatch {
        let Some(agent) = self.agents.get(message.receiver()) else {
            warn!(
                message_id = %message.id(),
                message_type = %message.kind(),
                receiver = %message.receiver(),
                "Receiver not registered, dropping message"
            );
            self.monitor.record_dispatch(None, Dispatch::Dropped);
            return Dispatch::Dropped;
        };

        let outcome = match AssertUnwindSafe(agent.process_message(&message))
            .catch_unwind()
            .await
        {
            Ok(Some(response)) => {
                debug!(
                    from = %response.sender(),
                    to = %response.receiver(),
                    message_type = %response.kind(),
                    "Re-enqueued response"
                );
                self.queue.requeue(response);
                Dispatch::Responded
            }
            Ok(None) => Dispatch::Delivered,
            Err(panic) => {
                error!(
                    message_id = %message.id(),
                    receiver = %message.receiver(),
                    error = %panic_message(panic.as_ref()),
                    "Agent panicked while handling message"
                );
                Dispatch::Failed
            }
        };
        self.monitor
            .record_dispatch(Some(message.receiver()), outcome);
        outcome
    }

    async fn handle(&self, message: Message) -> Dispatch {
        let outcome = self.deliver(message).await;
        self.queue.task_done();
        outcome
    }

    /// Dispatch the head of the queue, if any.
    pub async fn dispatch_next(&self) -> Option<Dispatch> {
        let message = self.queue.pop()?;
        Some(self.handle(message).await)
    }

    /// Dispatch until the queue is empty, including responses produced
    /// along the way. Returns the number of messages dispatched.
    pub async fn drain(&self) -> usize {
        let mut dispatched = 0;
        while self.dispatch_next().await.is_some() {
            dispatched += 1;
        }
        dispatched
    }

    /// Deliver messages until `shutdown` turns true or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Message router started");
        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                message = self.queue.recv() => {
                    self.handle(message).await;
                }
            }
        }
        info!(queued = self.queue.len(), "Message router stopped");
    }

    /// Run the router on a background task.
    pub fn spawn(&self) -> RouterHandle {
        let (stop, shutdown) = watch::channel(false);
        let router = self.clone();
        let task = tokio::spawn(async move { router.run(shutdown).await });
        RouterHandle {
            stop,
            queue: self.queue.clone(),
            task,
        }
    }
}

/// Handle to a router running in the background.
pub struct RouterHandle {
    stop: watch::Sender<bool>,
    queue: Arc<MessageQueue>,
    task: JoinHandle<()>,
}

impl RouterHandle {
    /// Stop after the message currently being handled, if any.
    pub async fn stop(self) -> AiseResult<()> {
        self.stop.send_replace(true);
        self.task
            .await
            .map_err(|e| AiseError::Router(format!("router task failed: {e}")))
    }

    /// Close the queue, wait until every queued message is handled, then
    /// stop.
    pub async fn drain_and_stop(self) -> AiseResult<()> {
        self.queue.close();
        self.queue.join().await;
        self.stop().await
    }

    /// Whether the background loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
