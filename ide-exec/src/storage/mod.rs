//! Storage interface for users, files, sharing and execution logs.
//!
//! The browser keeps its real data in Firebase; [`MemStorage`] is a
//! process-lifetime stand-in that satisfies the same interface.

mod memory;
mod models;

pub use memory::MemStorage;
pub use models::{
    Collaborator, ExecutionLog, File, FileKind, FileUpdate, NewExecutionLog, NewFile, NewUser,
    ShareRequest, SharedFile, User,
};

use async_trait::async_trait;

use crate::error::Error;

#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_user(&self, id: u64) -> Result<Option<User>, Error>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, Error>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error>;
    async fn get_user_by_firebase_uid(&self, firebase_uid: &str) -> Result<Option<User>, Error>;
    async fn create_user(&self, user: NewUser) -> Result<User, Error>;

    async fn get_file(&self, id: u64) -> Result<Option<File>, Error>;
    async fn get_files_by_user_id(&self, user_id: u64) -> Result<Vec<File>, Error>;
    async fn create_file(&self, file: NewFile) -> Result<File, Error>;
    /// Returns `None` when no file has this id.
    async fn update_file(&self, id: u64, update: FileUpdate) -> Result<Option<File>, Error>;
    /// Returns whether a file was removed.
    async fn delete_file(&self, id: u64) -> Result<bool, Error>;

    /// Add a collaborator to a file and index the file under the recipient.
    async fn share_file(&self, file_id: u64, share: ShareRequest) -> Result<Collaborator, Error>;
    async fn get_collaborators(&self, file_id: u64) -> Result<Vec<Collaborator>, Error>;
    async fn get_shared_files(&self, user_id: u64) -> Result<Vec<SharedFile>, Error>;

    async fn create_execution_log(&self, log: NewExecutionLog) -> Result<ExecutionLog, Error>;
    async fn get_execution_logs_by_user_id(&self, user_id: &str)
        -> Result<Vec<ExecutionLog>, Error>;
}
