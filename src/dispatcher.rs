//! Asynchronous height-update dispatcher.
//!
//! Submissions go into a bounded pending queue.  A fixed set of worker
//! tasks each register an inbound channel in the idle pool whenever they
//! have nothing to do; the scheduling loop pairs the oldest pending request
//! with an idle worker and hands it over.  The scheduler only ever waits on
//! the pool when every worker is busy, so one slow gateway call never holds
//! up a request that another idle worker could take.
//!
//! Writes are one-way: once a request is queued nobody hears about its
//! outcome.  Lookups that miss and gateway failures are logged and dropped.

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::mpsc::error::SendError;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::directory::ShadeDirectory;
use crate::error::{DispatchError, LookupError};
use crate::gateway::Gateway;
use crate::types::UpdateRequest;

/// Pending queue size used by the default configuration.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// An idle worker's inbound channel, as registered in the pool.
struct IdleSlot {
    worker_id: usize,
    work: mpsc::Sender<UpdateRequest>,
}

/// Cloneable handle for queueing updates.
///
/// Submitting waits only while the pending queue is full.
#[derive(Clone)]
pub struct Submitter {
    queue: mpsc::Sender<UpdateRequest>,
}

impl Submitter {
    pub async fn submit(&self, request: UpdateRequest) -> Result<(), DispatchError> {
        info!(
            "Queueing update request for shade {} (height {})",
            request.target_id, request.desired_height
        );
        self.queue
            .send(request)
            .await
            .map_err(|_| DispatchError::Closed)
    }

    /// Queue a move of shade `id` to `percent`, returning the queued request.
    pub async fn submit_height(
        &self,
        id: &str,
        percent: u8,
    ) -> Result<UpdateRequest, DispatchError> {
        let request = UpdateRequest::from_percent(id, percent);
        self.submit(request.clone()).await?;
        Ok(request)
    }
}

struct WorkerHandle {
    id: usize,
    quit: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Ask the worker to stop once its current request, if any, is done.
    fn stop(&mut self) {
        if let Some(quit) = self.quit.take() {
            let _ = quit.send(());
        }
    }
}

pub struct Dispatcher {
    submitter: Submitter,
    workers: Vec<WorkerHandle>,
    scheduler: JoinHandle<()>,
}

impl Dispatcher {
    /// Spawn `workers` worker tasks and the scheduling loop.
    ///
    /// Both `workers` and `capacity` are raised to at least one.
    pub fn start(
        workers: usize,
        capacity: usize,
        directory: Arc<ShadeDirectory>,
        gateway: Arc<dyn Gateway>,
    ) -> Self {
        let workers = workers.max(1);
        let (queue_tx, queue_rx) = mpsc::channel(capacity.max(1));
        let (idle_tx, idle_rx) = mpsc::channel(workers);

        let handles: Vec<WorkerHandle> = (1..=workers)
            .map(|id| {
                let (quit_tx, quit_rx) = oneshot::channel();
                let (work_tx, work_rx) = mpsc::channel(1);
                let worker = Worker {
                    id,
                    work_tx,
                    work_rx,
                    idle_pool: idle_tx.clone(),
                    quit: quit_rx,
                    directory: Arc::clone(&directory),
                    gateway: Arc::clone(&gateway),
                };
                info!("Starting worker {}", id);
                WorkerHandle {
                    id,
                    quit: Some(quit_tx),
                    task: tokio::spawn(worker.run()),
                }
            })
            .collect();
        drop(idle_tx);

        let scheduler = tokio::spawn(schedule(queue_rx, idle_rx));

        Self {
            submitter: Submitter { queue: queue_tx },
            workers: handles,
            scheduler,
        }
    }

    pub fn submitter(&self) -> Submitter {
        self.submitter.clone()
    }

    pub async fn submit(&self, request: UpdateRequest) -> Result<(), DispatchError> {
        self.submitter.submit(request).await
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stop one worker.  Returns `false` if no worker has that id.
    pub fn stop_worker(&mut self, id: usize) -> bool {
        match self.workers.iter_mut().find(|w| w.id == id) {
            Some(worker) => {
                worker.stop();
                true
            }
            None => false,
        }
    }

    /// Stop every worker, wait for in-flight requests to finish and for the
    /// scheduler to exit.  Later submissions fail with
    /// [`DispatchError::Closed`].
    pub async fn shutdown(self) {
        let Dispatcher {
            submitter,
            mut workers,
            scheduler,
        } = self;
        drop(submitter);

        for worker in &mut workers {
            worker.stop();
        }
        for worker in workers {
            if let Err(e) = worker.task.await {
                error!("Worker {} panicked: {}", worker.id, e);
            }
        }
        if let Err(e) = scheduler.await {
            error!("Update scheduler panicked: {}", e);
        }
    }
}

/// Pair pending requests with idle workers until no worker is left or
/// every submitter is gone.
async fn schedule(
    mut pending: mpsc::Receiver<UpdateRequest>,
    mut idle: mpsc::Receiver<IdleSlot>,
) {
    let mut held: Option<UpdateRequest> = None;

    while let Some(slot) = idle.recv().await {
        let request = match held.take() {
            Some(request) => request,
            None => tokio::select! {
                request = pending.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
                // The worker stopped while we held its slot.
                _ = slot.work.closed() => continue,
            },
        };

        debug!(
            "Dispatching update for shade {} to worker {}",
            request.target_id, slot.worker_id
        );
        if let Err(SendError(request)) = slot.work.send(request).await {
            debug!("Worker {} stopped before hand-off", slot.worker_id);
            held = Some(request);
        }
    }

    pending.close();
    for request in held.into_iter().chain(std::iter::from_fn(|| pending.try_recv().ok())) {
        warn!(
            "No workers left, dropping update for shade {}",
            request.target_id
        );
    }
    debug!("Update scheduler exiting");
}

struct Worker {
    id: usize,
    work_tx: mpsc::Sender<UpdateRequest>,
    work_rx: mpsc::Receiver<UpdateRequest>,
    idle_pool: mpsc::Sender<IdleSlot>,
    quit: oneshot::Receiver<()>,
    directory: Arc<ShadeDirectory>,
    gateway: Arc<dyn Gateway>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            // A dropped handle counts as a stop request.
            if !matches!(self.quit.try_recv(), Err(TryRecvError::Empty)) {
                break;
            }

            let slot = IdleSlot {
                worker_id: self.id,
                work: self.work_tx.clone(),
            };
            if self.idle_pool.send(slot).await.is_err() {
                break;
            }

            // We hold a sender ourselves, so `None` can only mean quit.
            let request = tokio::select! {
                biased;
                request = self.work_rx.recv() => request,
                _ = &mut self.quit => None,
            };
            match request {
                Some(request) => self.handle(request).await,
                None => break,
            }
        }

        // Anything handed over before the channel closed is still ours.
        self.work_rx.close();
        while let Ok(request) = self.work_rx.try_recv() {
            self.handle(request).await;
        }
        info!("Worker {} stopping", self.id);
    }

    async fn handle(&self, request: UpdateRequest) {
        let shade = match self.directory.find_shade(&request.target_id).await {
            Ok(shade) => shade,
            Err(LookupError::NotFound(id)) => {
                warn!("Shade {} not found.", id);
                return;
            }
            Err(e) => {
                error!(
                    "Worker {} could not look up shade {}: {}",
                    self.id, request.target_id, e
                );
                return;
            }
        };

        if let Err(e) = self
            .gateway
            .set_height(&shade, request.desired_height)
            .await
        {
            error!(
                "Worker {} failed to move shade {} to {}: {}",
                self.id, shade.id, request.desired_height, e
            );
        }
    }
}
