use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::{
    config::ExecConfig,
    error::Error,
    interpreter::Interpreter,
    service::CodeExecutionService,
    storage::{
        Collaborator, ExecutionLog, File, FileUpdate, MemStorage, NewExecutionLog, NewFile,
        NewUser, ShareRequest, SharedFile, Storage, User,
    },
};

/// Skip the current test when no Python interpreter is on `PATH`.
macro_rules! require_python {
    () => {
        if !$crate::tests::utils::python_available() {
            eprintln!("python interpreter not found, skipping");
            return Ok(());
        }
    };
}
pub(crate) use require_python;

pub fn python_available() -> bool {
    Interpreter::python().is_available()
}

pub mod defaults {
    use super::*;

    pub fn test_config(scratch: &Path) -> ExecConfig {
        ExecConfig {
            scratch_dir: scratch.join("scratch"),
            timeout_secs: 5,
            ..Default::default()
        }
    }

    pub fn short_timeout_config(scratch: &Path) -> ExecConfig {
        ExecConfig {
            timeout_secs: 1,
            ..test_config(scratch)
        }
    }

    pub fn setup_service(
        config: ExecConfig,
    ) -> Result<(CodeExecutionService, Arc<MemStorage>), Error> {
        let storage = Arc::new(MemStorage::new());
        let service = CodeExecutionService::new(config, storage.clone())?;
        Ok((service, storage))
    }
}

/// Number of entries left in the scratch directory, zero if it was never created.
pub async fn scratch_entries(config: &ExecConfig) -> usize {
    let Ok(mut entries) = tokio::fs::read_dir(&config.scratch_dir).await else {
        return 0;
    };
    let mut count = 0;
    while let Ok(Some(_)) = entries.next_entry().await {
        count += 1;
    }
    count
}

/// Storage whose execution log writes always fail.
#[derive(Default)]
pub struct BrokenLogStorage {
    inner: MemStorage,
}

#[async_trait]
impl Storage for BrokenLogStorage {
    async fn get_user(&self, id: u64) -> Result<Option<User>, Error> {
        self.inner.get_user(id).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        self.inner.get_user_by_username(username).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.inner.get_user_by_email(email).await
    }

    async fn get_user_by_firebase_uid(&self, firebase_uid: &str) -> Result<Option<User>, Error> {
        self.inner.get_user_by_firebase_uid(firebase_uid).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        self.inner.create_user(user).await
    }

    async fn get_file(&self, id: u64) -> Result<Option<File>, Error> {
        self.inner.get_file(id).await
    }

    async fn get_files_by_user_id(&self, user_id: u64) -> Result<Vec<File>, Error> {
        self.inner.get_files_by_user_id(user_id).await
    }

    async fn create_file(&self, file: NewFile) -> Result<File, Error> {
        self.inner.create_file(file).await
    }

    async fn update_file(&self, id: u64, update: FileUpdate) -> Result<Option<File>, Error> {
        self.inner.update_file(id, update).await
    }

    async fn delete_file(&self, id: u64) -> Result<bool, Error> {
        self.inner.delete_file(id).await
    }

    async fn share_file(&self, file_id: u64, share: ShareRequest) -> Result<Collaborator, Error> {
        self.inner.share_file(file_id, share).await
    }

    async fn get_collaborators(&self, file_id: u64) -> Result<Vec<Collaborator>, Error> {
        self.inner.get_collaborators(file_id).await
    }

    async fn get_shared_files(&self, user_id: u64) -> Result<Vec<SharedFile>, Error> {
        self.inner.get_shared_files(user_id).await
    }

    async fn create_execution_log(&self, _log: NewExecutionLog) -> Result<ExecutionLog, Error> {
        Err(Error::System("log store unavailable".to_string()))
    }

    async fn get_execution_logs_by_user_id(
        &self,
        user_id: &str,
    ) -> Result<Vec<ExecutionLog>, Error> {
        self.inner.get_execution_logs_by_user_id(user_id).await
    }
}
