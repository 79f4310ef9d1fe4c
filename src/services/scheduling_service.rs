//! Scheduling Service for AmbiDream
//!
//! Runs the periodic reminder, statistics and report jobs on cron schedules.

use crate::job_span;
use crate::logging::log_job_completed;
use crate::models::scheduled_task::{ScheduledTask, ScheduledTaskType};
use crate::services::time_provider::TimeProvider;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use strum::IntoEnumIterator;
use tokio::sync::{Mutex, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

/// Errors that can occur during scheduling operations
#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] JobSchedulerError),

    #[error("Job not found: {job_id}")]
    JobNotFound { job_id: String },

    #[error("Invalid cron expression: {cron_expression}")]
    InvalidCronExpression { cron_expression: String },

    #[error("No handler registered for {task_type}")]
    NoHandler { task_type: ScheduledTaskType },

    #[error("Task execution failed: {message}")]
    TaskExecutionFailed { message: String },

    #[error("Scheduler not started")]
    SchedulerNotStarted,
}

/// Result type for scheduling operations
pub type SchedulingResult<T> = Result<T, SchedulingError>;

/// Work executed when a scheduled task fires
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Run the task, returning how many items were processed
    async fn execute(&self, task: &ScheduledTask, context: &TaskContext) -> SchedulingResult<usize>;
}

/// Context provided to task handlers during execution
#[derive(Debug, Clone)]
pub struct TaskContext {
    /// When the task started, according to the service's clock
    pub started_at: DateTime<Utc>,
}

type HandlerRegistry = Arc<RwLock<HashMap<ScheduledTaskType, Arc<dyn TaskHandler>>>>;

/// Service for managing background task scheduling
pub struct SchedulingService {
    scheduler: Arc<Mutex<Option<JobScheduler>>>,
    task_handlers: HandlerRegistry,
    time_provider: Arc<dyn TimeProvider>,
}

impl SchedulingService {
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            scheduler: Arc::new(Mutex::new(None)),
            task_handlers: Arc::new(RwLock::new(HashMap::new())),
            time_provider,
        }
    }

    /// Create the underlying scheduler and start ticking
    pub async fn start(&self) -> SchedulingResult<()> {
        let mut guard = self.scheduler.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let scheduler = JobScheduler::new().await?;
        scheduler.start().await?;
        *guard = Some(scheduler);
        info!("Scheduling service started");
        Ok(())
    }

    pub async fn stop(&self) -> SchedulingResult<()> {
        let mut guard = self.scheduler.lock().await;
        if let Some(mut scheduler) = guard.take() {
            scheduler.shutdown().await?;
            info!("Scheduling service stopped");
        }
        Ok(())
    }

    /// Registers a task handler for a specific task type
    ///
    /// # Arguments
    /// * `task_type` - The type of task this handler can process
    /// * `handler` - The handler implementation
    pub async fn register_handler(&self, task_type: ScheduledTaskType, handler: Arc<dyn TaskHandler>) {
        let mut handlers = self.task_handlers.write().await;
        handlers.insert(task_type, handler);
        info!(task_type = %task_type, "Registered task handler");
    }

    /// Execute the handler for `task` once
    async fn run(
        handlers: &HandlerRegistry,
        time_provider: &Arc<dyn TimeProvider>,
        task: &ScheduledTask,
    ) -> SchedulingResult<usize> {
        let handler = handlers
            .read()
            .await
            .get(&task.task_type)
            .cloned()
            .ok_or(SchedulingError::NoHandler {
                task_type: task.task_type,
            })?;

        let context = TaskContext {
            started_at: time_provider.now_utc(),
        };
        let timer = Instant::now();
        let processed = handler.execute(task, &context).await?;

        tracing::Span::current().record("processed", processed);
        log_job_completed(task.task_type.display_name(), processed, timer.elapsed().as_millis());
        Ok(processed)
    }

    /// Run a task immediately, outside its schedule
    pub async fn run_now(&self, task_type: ScheduledTaskType) -> SchedulingResult<usize> {
        let task = ScheduledTask::system_task(task_type);
        Self::run(&self.task_handlers, &self.time_provider, &task)
            .instrument(job_span!(task_type))
            .await
    }

    /// Schedules a task on its cron expression
    ///
    /// # Returns
    /// The scheduler's job id
    pub async fn schedule_task(&self, task: ScheduledTask) -> SchedulingResult<String> {
        let guard = self.scheduler.lock().await;
        let scheduler = guard.as_ref().ok_or(SchedulingError::SchedulerNotStarted)?;

        let cron_expression = task.cron_expression.clone();
        let handlers = Arc::clone(&self.task_handlers);
        let time_provider = Arc::clone(&self.time_provider);
        let task = Arc::new(task);
        let job_task = Arc::clone(&task);

        let job = Job::new_async(cron_expression.as_str(), move |_uuid, _scheduler| {
            let handlers = Arc::clone(&handlers);
            let time_provider = Arc::clone(&time_provider);
            let task = Arc::clone(&job_task);

            Box::pin(async move {
                let span = job_span!(task.task_type);
                match Self::run(&handlers, &time_provider, &task).instrument(span).await {
                    Ok(_) => {}
                    Err(SchedulingError::NoHandler { task_type }) => {
                        warn!(task_type = %task_type, "No handler found for task type");
                    }
                    Err(e) => error!(task_id = %task.id, error = %e, "Task execution failed"),
                }
            })
        })
        .map_err(|_| SchedulingError::InvalidCronExpression {
            cron_expression: cron_expression.clone(),
        })?;

        let job_id = scheduler.add(job).await?;
        info!(task_id = %task.id, cron = %cron_expression, "Scheduled task");
        Ok(job_id.to_string())
    }

    /// Schedule every task type that has a registered handler on its
    /// default cron expression
    pub async fn schedule_system_tasks(&self) -> SchedulingResult<Vec<String>> {
        let registered: Vec<ScheduledTaskType> = {
            let handlers = self.task_handlers.read().await;
            ScheduledTaskType::iter()
                .filter(|task_type| handlers.contains_key(task_type))
                .collect()
        };

        let mut job_ids = Vec::with_capacity(registered.len());
        for task_type in registered {
            job_ids.push(self.schedule_task(ScheduledTask::system_task(task_type)).await?);
        }
        Ok(job_ids)
    }

    pub async fn unschedule_task(&self, job_id: &str) -> SchedulingResult<()> {
        let guard = self.scheduler.lock().await;
        let scheduler = guard.as_ref().ok_or(SchedulingError::SchedulerNotStarted)?;

        let uuid = Uuid::parse_str(job_id).map_err(|_| SchedulingError::JobNotFound {
            job_id: job_id.to_string(),
        })?;
        scheduler.remove(&uuid).await?;

        info!(job_id = %job_id, "Unscheduled task");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.scheduler.lock().await.is_some()
    }
}
