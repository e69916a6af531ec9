use super::dispatcher::{DispatchEngine, DispatchOutcome, DispatchRequest};
use crate::error::{DispatchError, Result};
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Dispatches allowed in flight at once.
    pub workers: usize,
    /// Requests waiting for a worker before callers run them themselves.
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 50,
            queue_capacity: 200,
        }
    }
}

struct Job {
    request: DispatchRequest,
    reply: oneshot::Sender<Result<DispatchOutcome>>,
}

/// The eventual result of a submitted dispatch.
pub struct DispatchTicket {
    rx: oneshot::Receiver<Result<DispatchOutcome>>,
}

impl DispatchTicket {
    fn ready(result: Result<DispatchOutcome>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx }
    }

    pub async fn outcome(self) -> Result<DispatchOutcome> {
        self.rx.await.map_err(|_| DispatchError::PoolClosed)?
    }
}

/// Cloneable submission side of a [`DispatchPool`].
#[derive(Clone)]
pub struct DispatchHandle {
    tx: mpsc::Sender<Job>,
    engine: Arc<DispatchEngine>,
}

impl DispatchHandle {
    pub fn engine(&self) -> &Arc<DispatchEngine> {
        &self.engine
    }

    /// Queues a dispatch and returns without waiting for it.
    ///
    /// When the queue is full the dispatch runs on the calling task
    /// instead, so a burst slows its producer down rather than losing work.
    pub async fn submit(&self, request: DispatchRequest) -> Result<DispatchTicket> {
        let (reply, rx) = oneshot::channel();
        match self.tx.try_send(Job { request, reply }) {
            Ok(()) => Ok(DispatchTicket { rx }),
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!("dispatch queue full, running on caller");
                Ok(DispatchTicket::ready(self.engine.dispatch(job.request).await))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DispatchError::PoolClosed),
        }
    }

    /// Submits and waits for the outcome.
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchOutcome> {
        self.submit(request).await?.outcome().await
    }
}

/// Process-wide pool running dispatches off the caller's path.
pub struct DispatchPool {
    handle: DispatchHandle,
    shutdown: watch::Sender<bool>,
    supervisor: JoinHandle<()>,
}

impl DispatchPool {
    pub fn start(engine: Arc<DispatchEngine>, config: PoolConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let supervisor = tokio::spawn(supervise(
            rx,
            shutdown_rx,
            engine.clone(),
            config.workers.max(1),
        ));
        info!(workers = config.workers, queue = config.queue_capacity, "dispatch pool started");
        Self {
            handle: DispatchHandle { tx, engine },
            shutdown,
            supervisor,
        }
    }

    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }

    /// Stops accepting work, then waits for queued and running dispatches.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(true);
        self.supervisor
            .await
            .map_err(|e| DispatchError::InternalError(Box::new(e)))?;
        info!("dispatch pool drained");
        Ok(())
    }
}

async fn supervise(
    mut rx: mpsc::Receiver<Job>,
    mut shutdown: watch::Receiver<bool>,
    engine: Arc<DispatchEngine>,
    workers: usize,
) {
    let slots = Arc::new(Semaphore::new(workers));
    let mut running = JoinSet::new();

    loop {
        let job = tokio::select! {
            job = rx.recv() => job,
            _ = shutdown.changed() => {
                rx.close();
                None
            }
        };
        let Some(job) = job else { break };
        run_job(job, &slots, &engine, &mut running).await;
        while running.try_join_next().is_some() {}
    }

    // Drain what was queued before intake closed.
    while let Some(job) = rx.recv().await {
        run_job(job, &slots, &engine, &mut running).await;
    }
    while running.join_next().await.is_some() {}
}

async fn run_job(
    job: Job,
    slots: &Arc<Semaphore>,
    engine: &Arc<DispatchEngine>,
    running: &mut JoinSet<()>,
) {
    let Ok(permit) = slots.clone().acquire_owned().await else {
        return;
    };
    let engine = engine.clone();
    running.spawn(async move {
        let result = engine.dispatch(job.request).await;
        if job.reply.send(result).is_err() {
            debug!("dispatch outcome dropped by submitter");
        }
        drop(permit);
    });
}
