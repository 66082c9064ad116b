use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    Collaborator, ExecutionLog, File, FileUpdate, NewExecutionLog, NewFile, NewUser,
    ShareRequest, SharedFile, Storage, User,
};
use crate::error::Error;

#[derive(Debug)]
struct Tables {
    users: BTreeMap<u64, User>,
    files: BTreeMap<u64, File>,
    /// file id -> collaborator user id -> record
    collaborations: BTreeMap<u64, BTreeMap<u64, Collaborator>>,
    /// recipient user id -> file id -> entry
    shared_files: BTreeMap<u64, BTreeMap<u64, SharedFile>>,
    execution_logs: BTreeMap<u64, ExecutionLog>,
    next_user_id: u64,
    next_file_id: u64,
    next_log_id: u64,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            files: BTreeMap::new(),
            collaborations: BTreeMap::new(),
            shared_files: BTreeMap::new(),
            execution_logs: BTreeMap::new(),
            next_user_id: 1,
            next_file_id: 1,
            next_log_id: 1,
        }
    }
}

fn next_id(counter: &mut u64) -> u64 {
    let id = *counter;
    *counter += 1;
    id
}

/// Map-backed [`Storage`] that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemStorage {
    tables: RwLock<Tables>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn get_user(&self, id: u64) -> Result<Option<User>, Error> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn get_user_by_firebase_uid(&self, firebase_uid: &str) -> Result<Option<User>, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.firebase_uid.as_deref() == Some(firebase_uid))
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        let mut tables = self.tables.write().await;
        let id = next_id(&mut tables.next_user_id);
        let user = User {
            id,
            username: user.username,
            password: user.password,
            firebase_uid: user.firebase_uid,
            email: user.email,
            display_name: user.display_name,
            photo_url: user.photo_url,
            created_at: Utc::now(),
        };
        tables.users.insert(id, user.clone());
        debug!("Created user {}", id);
        Ok(user)
    }

    async fn get_file(&self, id: u64) -> Result<Option<File>, Error> {
        Ok(self.tables.read().await.files.get(&id).cloned())
    }

    async fn get_files_by_user_id(&self, user_id: u64) -> Result<Vec<File>, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .files
            .values()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_file(&self, file: NewFile) -> Result<File, Error> {
        let mut tables = self.tables.write().await;
        let id = next_id(&mut tables.next_file_id);
        let now = Utc::now();
        let file = File {
            id,
            user_id: file.user_id,
            name: file.name,
            content: file.content,
            path: file.path.unwrap_or_else(|| "/".to_string()),
            kind: file.kind,
            shared: false,
            created_at: now,
            updated_at: now,
        };
        tables.files.insert(id, file.clone());
        debug!("Created file {} for user {}", id, file.user_id);
        Ok(file)
    }

    async fn update_file(&self, id: u64, update: FileUpdate) -> Result<Option<File>, Error> {
        let mut tables = self.tables.write().await;
        let Some(file) = tables.files.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = update.name {
            file.name = name;
        }
        if let Some(content) = update.content {
            file.content = Some(content);
        }
        if let Some(path) = update.path {
            file.path = path;
        }
        if let Some(kind) = update.kind {
            file.kind = kind;
        }
        file.updated_at = Utc::now();

        Ok(Some(file.clone()))
    }

    async fn delete_file(&self, id: u64) -> Result<bool, Error> {
        let mut tables = self.tables.write().await;
        if tables.files.remove(&id).is_none() {
            return Ok(false);
        }

        tables.collaborations.remove(&id);
        for entries in tables.shared_files.values_mut() {
            entries.remove(&id);
        }
        tables.shared_files.retain(|_, entries| !entries.is_empty());

        debug!("Deleted file {}", id);
        Ok(true)
    }

    async fn share_file(&self, file_id: u64, share: ShareRequest) -> Result<Collaborator, Error> {
        let email = share.email.trim();
        if email.is_empty() {
            return Err(Error::InvalidInput(
                "Please enter an email address".to_string(),
            ));
        }

        let mut tables = self.tables.write().await;

        let owner_id = tables
            .files
            .get(&file_id)
            .map(|f| f.user_id)
            .ok_or_else(|| Error::NotFound(format!("File {} not found", file_id)))?;

        let sharer = tables
            .users
            .get(&share.added_by)
            .ok_or_else(|| Error::NotFound(format!("User {} not found", share.added_by)))?;
        let shared_by = sharer.email.clone().unwrap_or_else(|| sharer.username.clone());

        if sharer.email.as_deref() == Some(email) {
            return Err(Error::InvalidInput(
                "You cannot share with yourself".to_string(),
            ));
        }

        let target_id = tables
            .users
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .map(|u| u.id)
            .ok_or_else(|| Error::NotFound("User with this email not found".to_string()))?;

        if tables
            .collaborations
            .get(&file_id)
            .is_some_and(|c| c.contains_key(&target_id))
        {
            return Err(Error::Conflict(
                "This user is already a collaborator".to_string(),
            ));
        }

        let now = Utc::now();
        let collaborator = Collaborator {
            user_id: target_id,
            email: email.to_string(),
            added_by: shared_by.clone(),
            added_at: now,
        };
        tables
            .collaborations
            .entry(file_id)
            .or_default()
            .insert(target_id, collaborator.clone());
        tables.shared_files.entry(target_id).or_default().insert(
            file_id,
            SharedFile {
                file_id,
                shared_by,
                shared_at: now,
                owner_id,
            },
        );
        if let Some(file) = tables.files.get_mut(&file_id) {
            file.shared = true;
        }

        debug!("Shared file {} with user {}", file_id, target_id);
        Ok(collaborator)
    }

    async fn get_collaborators(&self, file_id: u64) -> Result<Vec<Collaborator>, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .collaborations
            .get(&file_id)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_shared_files(&self, user_id: u64) -> Result<Vec<SharedFile>, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .shared_files
            .get(&user_id)
            .map(|s| s.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn create_execution_log(&self, log: NewExecutionLog) -> Result<ExecutionLog, Error> {
        let mut tables = self.tables.write().await;
        let id = next_id(&mut tables.next_log_id);
        let log = ExecutionLog {
            id,
            user_id: log.user_id,
            file_id: log.file_id,
            code: log.code,
            output: log.output,
            error: log.error,
            executed_at: Utc::now(),
        };
        tables.execution_logs.insert(id, log.clone());
        Ok(log)
    }

    async fn get_execution_logs_by_user_id(
        &self,
        user_id: &str,
    ) -> Result<Vec<ExecutionLog>, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .execution_logs
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect())
    }
}
