use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub firebase_uid: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub firebase_uid: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Folder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: u64,
    /// Owner
    pub user_id: u64,
    pub name: String,
    pub content: Option<String>,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    /// Set once the file has a collaborator
    pub shared: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFile {
    pub user_id: u64,
    pub name: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(rename = "type")]
    pub kind: FileKind,
}

/// Partial file update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<FileKind>,
}

/// Entry in a file's collaboration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    pub user_id: u64,
    pub email: String,
    /// Email of the user who shared the file
    pub added_by: String,
    pub added_at: DateTime<Utc>,
}

/// Entry in the recipient's shared-file index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedFile {
    pub file_id: u64,
    pub shared_by: String,
    pub shared_at: DateTime<Utc>,
    pub owner_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    /// Recipient's email
    pub email: String,
    /// Id of the sharing user
    pub added_by: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLog {
    pub id: u64,
    pub user_id: String,
    pub file_id: Option<u64>,
    pub code: String,
    pub output: Option<String>,
    pub error: Option<String>,
    pub executed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExecutionLog {
    pub user_id: String,
    #[serde(default)]
    pub file_id: Option<u64>,
    pub code: String,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_is_not_serialized() {
        let user = User {
            id: 1,
            username: "ada".to_string(),
            password: "secret".to_string(),
            firebase_uid: None,
            email: Some("ada@example.com".to_string()),
            display_name: None,
            photo_url: None,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password").is_none());
        assert_eq!(value["email"], "ada@example.com");
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn test_file_kind_field_is_type() {
        let file: NewFile =
            serde_json::from_str(r#"{"userId": 3, "name": "src", "type": "folder"}"#).unwrap();
        assert_eq!(file.kind, FileKind::Folder);
        assert_eq!(file.path, None);
    }
}
