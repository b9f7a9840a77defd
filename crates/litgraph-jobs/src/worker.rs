//! Job worker: queue consumption, scheduled hydration and bounded execution.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinSet;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use litgraph_core::{defaults, Error, Result};
use litgraph_pipeline::Pipeline;

use crate::handler::{
    EnrichCitationsHandler, HydrateStubsHandler, Job, JobContext, JobHandler, JobKind, JobResult,
    JobType,
};

type HandlerMap = Arc<RwLock<HashMap<JobType, Arc<dyn JobHandler>>>>;

/// Configuration for the job worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum number of concurrent jobs.
    pub max_concurrent_jobs: usize,
    /// Whether to enable job processing.
    pub enabled: bool,
    /// Interval between scheduled hydration runs. Zero disables the schedule.
    pub hydrate_interval_secs: u64,
    /// Stubs per scheduled hydration run; `None` uses the pipeline default.
    pub hydrate_batch_limit: Option<i64>,
    /// Capacity of the submission queue.
    pub queue_capacity: usize,
    /// Wall-clock limit for one job.
    pub job_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: defaults::JOB_MAX_CONCURRENT,
            enabled: true,
            hydrate_interval_secs: defaults::HYDRATE_INTERVAL_SECS,
            hydrate_batch_limit: None,
            queue_capacity: defaults::JOB_QUEUE_CAPACITY,
            job_timeout_secs: defaults::JOB_TIMEOUT_SECS,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `JOB_WORKER_ENABLED` | `true` | Enable/disable job processing |
    /// | `JOB_MAX_CONCURRENT` | `4` | Max concurrent jobs |
    /// | `HYDRATE_INTERVAL_SECS` | `900` | Scheduled hydration interval (0 disables) |
    /// | `HYDRATE_BATCH_LIMIT` | pipeline default | Stubs per scheduled run |
    /// | `JOB_QUEUE_CAPACITY` | `1024` | Submission queue capacity |
    pub fn from_env() -> Self {
        let enabled = std::env::var("JOB_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent_jobs = std::env::var("JOB_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::JOB_MAX_CONCURRENT)
            .max(1);

        let hydrate_interval_secs = std::env::var("HYDRATE_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::HYDRATE_INTERVAL_SECS);

        let hydrate_batch_limit = std::env::var("HYDRATE_BATCH_LIMIT")
            .ok()
            .and_then(|v| v.parse::<i64>().ok());

        let queue_capacity = std::env::var("JOB_QUEUE_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::JOB_QUEUE_CAPACITY)
            .max(1);

        Self {
            max_concurrent_jobs,
            enabled,
            hydrate_interval_secs,
            hydrate_batch_limit,
            queue_capacity,
            job_timeout_secs: defaults::JOB_TIMEOUT_SECS,
        }
    }

    /// Set maximum concurrent jobs.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }

    /// Enable or disable job processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_hydrate_interval(mut self, secs: u64) -> Self {
        self.hydrate_interval_secs = secs;
        self
    }

    pub fn with_hydrate_batch_limit(mut self, limit: i64) -> Self {
        self.hydrate_batch_limit = Some(limit);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_job_timeout(mut self, secs: u64) -> Self {
        self.job_timeout_secs = secs;
        self
    }
}

/// Event emitted by the job worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A job was started.
    JobStarted { job_id: Uuid, job_type: JobType },
    /// A job completed successfully.
    JobCompleted {
        job_id: Uuid,
        job_type: JobType,
        result: Option<serde_json::Value>,
    },
    /// A job failed.
    JobFailed {
        job_id: Uuid,
        job_type: JobType,
        error: String,
    },
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
}

/// Cloneable sender for submitting jobs to a running worker.
#[derive(Clone)]
pub struct JobSubmitter {
    job_tx: mpsc::Sender<Job>,
}

impl JobSubmitter {
    /// Queue a job without waiting. Fails when the queue is full or the
    /// worker has stopped.
    pub fn submit(&self, kind: JobKind) -> Result<Uuid> {
        let job = Job::new(kind);
        let id = job.id;
        let job_type = job.job_type();
        self.job_tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                Error::Internal(format!("job queue full, dropped {job_type} job"))
            }
            mpsc::error::TrySendError::Closed(_) => {
                Error::Internal("job worker is not running".to_string())
            }
        })?;
        debug!(job_id = %id, %job_type, "Job queued");
        Ok(id)
    }
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    submitter: JobSubmitter,
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Queue a job.
    pub fn submit(&self, kind: JobKind) -> Result<Uuid> {
        self.submitter.submit(kind)
    }

    pub fn submitter(&self) -> JobSubmitter {
        self.submitter.clone()
    }

    /// Signal the worker to shut down gracefully. In-flight jobs finish first.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Job worker that executes queued and scheduled jobs.
pub struct JobWorker {
    config: WorkerConfig,
    handlers: HandlerMap,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobWorker {
    pub fn new(config: WorkerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            config,
            handlers: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
        }
    }

    /// Register a handler for a job type.
    pub async fn register_handler<H: JobHandler + 'static>(&self, handler: H) {
        let job_type = handler.job_type();
        let mut handlers = self.handlers.write().await;
        handlers.insert(job_type, Arc::new(handler));
        debug!(?job_type, "Registered job handler");
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let (job_tx, mut job_rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let event_rx = self.event_tx.subscribe();

        tokio::spawn(async move {
            self.run(&mut job_rx, &mut shutdown_rx).await;
        });

        WorkerHandle {
            submitter: JobSubmitter { job_tx },
            shutdown_tx,
            event_rx,
        }
    }

    /// Run the worker loop.
    ///
    /// At most `max_concurrent_jobs` run at once; while the limit is reached
    /// neither the queue nor the schedule is polled.
    #[instrument(skip_all, fields(subsystem = "jobs", component = "worker"))]
    async fn run(&self, job_rx: &mut mpsc::Receiver<Job>, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Job worker is disabled, not starting");
            return;
        }

        let max_concurrent = self.config.max_concurrent_jobs.max(1);
        let mut schedule = (self.config.hydrate_interval_secs > 0).then(|| {
            let mut ticker = interval(Duration::from_secs(self.config.hydrate_interval_secs));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });

        info!(
            max_concurrent,
            hydrate_interval_secs = self.config.hydrate_interval_secs,
            "Job worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let mut tasks = JoinSet::new();
        loop {
            let has_capacity = tasks.len() < max_concurrent;
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Job worker received shutdown signal");
                    break;
                }
                Some(job) = job_rx.recv(), if has_capacity => {
                    tasks.spawn(self.clone_refs().execute_job(job));
                }
                _ = next_tick(&mut schedule), if has_capacity => {
                    let job = Job::new(JobKind::HydrateStubs {
                        ids: Vec::new(),
                        limit: self.config.hydrate_batch_limit,
                    });
                    debug!(job_id = %job.id, "Scheduled hydration");
                    tasks.spawn(self.clone_refs().execute_job(job));
                }
                Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = result {
                        error!(error = ?e, "Job task panicked");
                    }
                }
            }
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = ?e, "Job task panicked");
            }
        }
        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Job worker stopped");
    }

    fn clone_refs(&self) -> JobWorkerRef {
        JobWorkerRef {
            handlers: self.handlers.clone(),
            event_tx: self.event_tx.clone(),
            timeout: Duration::from_secs(self.config.job_timeout_secs.max(1)),
        }
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }
}

async fn next_tick(schedule: &mut Option<Interval>) {
    match schedule {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Reference bundle for executing a single job in a spawned task.
struct JobWorkerRef {
    handlers: HandlerMap,
    event_tx: broadcast::Sender<WorkerEvent>,
    timeout: Duration,
}

impl JobWorkerRef {
    async fn execute_job(self, job: Job) {
        let start = Instant::now();
        let job_id = job.id;
        let job_type = job.job_type();

        info!(%job_id, %job_type, "Processing job");
        let _ = self
            .event_tx
            .send(WorkerEvent::JobStarted { job_id, job_type });

        let handler = {
            let handlers = self.handlers.read().await;
            handlers.get(&job_type).cloned()
        };

        let result = match handler {
            Some(handler) => {
                match tokio::time::timeout(self.timeout, handler.execute(JobContext::new(job)))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => JobResult::Failed(format!(
                        "Job exceeded timeout of {}s",
                        self.timeout.as_secs()
                    )),
                }
            }
            None => {
                warn!(%job_type, "No handler registered for job type");
                JobResult::Failed(format!("No handler for job type: {job_type}"))
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match result {
            JobResult::Success(result) => {
                info!(%job_id, %job_type, duration_ms, "Job completed successfully");
                let _ = self.event_tx.send(WorkerEvent::JobCompleted {
                    job_id,
                    job_type,
                    result,
                });
            }
            JobResult::Failed(error) => {
                warn!(%job_id, %job_type, %error, duration_ms, "Job failed");
                let _ = self.event_tx.send(WorkerEvent::JobFailed {
                    job_id,
                    job_type,
                    error,
                });
            }
        }
    }
}

/// Builder for creating a job worker with handlers.
pub struct WorkerBuilder {
    config: WorkerConfig,
    handlers: Vec<Box<dyn JobHandler>>,
}

impl WorkerBuilder {
    pub fn new() -> Self {
        Self {
            config: WorkerConfig::default(),
            handlers: Vec::new(),
        }
    }

    /// Worker with the hydration and enrichment handlers for a pipeline.
    pub fn for_pipeline(pipeline: &Pipeline) -> Self {
        Self::new()
            .with_handler(HydrateStubsHandler::new(pipeline.hydrator.clone()))
            .with_handler(EnrichCitationsHandler::new(pipeline.enricher.clone()))
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_handler<H: JobHandler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub async fn build(self) -> JobWorker {
        let worker = JobWorker::new(self.config);
        {
            let mut handlers = worker.handlers.write().await;
            for handler in self.handlers {
                handlers.insert(handler.job_type(), Arc::from(handler));
            }
        }
        worker
    }
}

impl Default for WorkerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
