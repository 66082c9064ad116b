use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::{
    config::ExecConfig,
    error::Error,
    executor::CodeExecutor,
    storage::{NewExecutionLog, Storage},
    types::{ExecutionRequest, ExecutionResult},
};

#[derive(Clone)]
pub struct CodeExecutionService {
    executor: Arc<CodeExecutor>,
    semaphore: Option<Arc<Semaphore>>,
    storage: Arc<dyn Storage>,
}

impl CodeExecutionService {
    pub fn new(config: ExecConfig, storage: Arc<dyn Storage>) -> Result<Self, Error> {
        let semaphore = config
            .max_concurrent
            .map(|permits| Arc::new(Semaphore::new(permits)));
        let executor = CodeExecutor::new(config)?;

        Ok(Self {
            executor: Arc::new(executor),
            semaphore,
            storage,
        })
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult, Error> {
        if request.code.is_empty() {
            return Err(Error::EmptyCode);
        }

        let _permit = match &self.semaphore {
            Some(semaphore) => Some(semaphore.acquire().await.map_err(|e| {
                Error::System(format!("Failed to acquire execution permit: {}", e))
            })?),
            None => None,
        };

        debug!("Starting code execution ({} bytes)", request.code.len());

        let result = self.executor.execute(&request).await;

        match &result {
            Ok(r) => info!(
                status = %r.status,
                elapsed_ms = r.execution_time.as_millis() as u64,
                "Code execution finished"
            ),
            Err(e) => error!("Code execution failed: {}", e),
        }

        if let Ok(r) = &result {
            self.record(&request, r).await;
        }

        result
    }

    /// Free admission slots, `None` when executions are unlimited.
    pub fn available_slots(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }

    async fn record(&self, request: &ExecutionRequest, result: &ExecutionResult) {
        let Some(user_id) = request.user_id.as_deref().filter(|u| !u.is_empty()) else {
            return;
        };

        let log = NewExecutionLog {
            user_id: user_id.to_string(),
            file_id: request.file_id,
            code: request.code.clone(),
            output: Some(result.stdout.clone()),
            error: result.error.clone(),
        };

        if let Err(e) = self.storage.create_execution_log(log).await {
            warn!("Error storing execution log: {}", e);
        }
    }
}
