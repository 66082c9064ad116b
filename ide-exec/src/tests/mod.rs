mod fixtures;
mod utils;

use tempfile::TempDir;

use crate::{
    error::Error, interpreter::Interpreter, storage::Storage, ExecutionRequest, ExecutionStatus,
    Result, SuccessPolicy,
};
use fixtures::{code_samples::*, test_scenarios::*};
use utils::{defaults::*, require_python, scratch_entries};

#[tokio::test]
async fn test_python_hello() -> Result<()> {
    require_python!();
    let temp = TempDir::new()?;
    let (service, _) = setup_service(test_config(temp.path()))?;

    let result = service.execute(ExecutionRequest::new(PYTHON_HELLO)).await?;
    assert!(result.is_success());
    assert_eq!(result.stdout, "hi\n");
    assert_eq!(result.error, None);
    assert_eq!(result.exit_code, Some(0));
    Ok(())
}

#[tokio::test]
async fn test_python_multiline() -> Result<()> {
    require_python!();
    let temp = TempDir::new()?;
    let (service, _) = setup_service(test_config(temp.path()))?;

    let result = service
        .execute(ExecutionRequest::new(PYTHON_MULTILINE))
        .await?;
    assert_eq!(result.stdout.trim(), "Factorial of 5 is 120");
    Ok(())
}

#[tokio::test]
async fn test_stdin_is_empty() -> Result<()> {
    require_python!();
    let temp = TempDir::new()?;
    let (service, _) = setup_service(test_config(temp.path()))?;

    let result = service
        .execute(ExecutionRequest::new(PYTHON_READS_STDIN))
        .await?;
    assert_eq!(result.stdout.trim(), "no input");
    Ok(())
}

#[tokio::test]
async fn test_python_raises() -> Result<()> {
    require_python!();
    let temp = TempDir::new()?;
    let (service, _) = setup_service(test_config(temp.path()))?;

    let result = service.execute(ExecutionRequest::new(PYTHON_RAISES)).await?;
    assert_eq!(result.status, ExecutionStatus::Error);
    let error = result.error.unwrap_or_default();
    assert!(error.contains("ValueError: boom"), "unexpected error: {}", error);
    Ok(())
}

#[tokio::test]
async fn test_python_syntax_error() -> Result<()> {
    require_python!();
    let temp = TempDir::new()?;
    let (service, _) = setup_service(test_config(temp.path()))?;

    let result = service
        .execute(ExecutionRequest::new(PYTHON_SYNTAX_ERROR))
        .await?;
    assert!(!result.is_success());
    assert!(result.error.unwrap_or_default().contains("SyntaxError"));
    Ok(())
}

#[tokio::test]
async fn test_silent_non_zero_exit() -> Result<()> {
    require_python!();
    let temp = TempDir::new()?;
    let (service, _) = setup_service(test_config(temp.path()))?;

    let result = service
        .execute(ExecutionRequest::new(PYTHON_EXIT_CODE))
        .await?;
    assert_eq!(result.status, ExecutionStatus::Error);
    assert_eq!(result.exit_code, Some(3));
    assert_eq!(result.error.as_deref(), Some("Process exited with status 3"));
    Ok(())
}

#[tokio::test]
async fn test_warning_classification() -> Result<()> {
    require_python!();
    let temp = TempDir::new()?;

    let (service, _) = setup_service(test_config(temp.path()))?;
    let result = service
        .execute(ExecutionRequest::new(PYTHON_WARNING))
        .await?;
    assert!(result.is_success());
    assert_eq!(result.stdout, "ok\n");
    assert_eq!(result.error.as_deref(), Some("warning: careful\n"));

    let mut config = test_config(temp.path());
    config.success_policy = SuccessPolicy::EmptyStderr;
    let (service, _) = setup_service(config)?;
    let result = service
        .execute(ExecutionRequest::new(PYTHON_WARNING))
        .await?;
    assert_eq!(result.status, ExecutionStatus::Error);
    assert_eq!(result.stdout, "ok\n");
    Ok(())
}

#[tokio::test]
async fn test_empty_code_spawns_nothing() -> Result<()> {
    let temp = TempDir::new()?;
    let config = test_config(temp.path());
    let (service, storage) = setup_service(config.clone())?;

    let result = service
        .execute(ExecutionRequest::new("").with_user("user-1"))
        .await;
    assert!(matches!(result, Err(Error::EmptyCode)));
    assert!(!config.scratch_dir.exists());

    assert!(storage
        .get_execution_logs_by_user_id("user-1")
        .await?
        .is_empty());
    Ok(())
}

#[tokio::test]
async fn test_missing_interpreter_is_reported() -> Result<()> {
    let temp = TempDir::new()?;
    let mut config = test_config(temp.path());
    config.interpreter = Interpreter::with_command("definitely-not-an-interpreter-4a1f");
    let (service, _) = setup_service(config.clone())?;

    let result = service.execute(ExecutionRequest::new(PYTHON_HELLO)).await?;
    assert_eq!(result.status, ExecutionStatus::SystemError);
    assert!(result
        .error
        .unwrap_or_default()
        .contains("Interpreter not found"));
    assert_eq!(scratch_entries(&config).await, 0);
    Ok(())
}

#[tokio::test]
async fn test_relative_scratch_dir() -> Result<()> {
    require_python!();
    let relative = std::path::PathBuf::from(format!("scratch-run-{}", uuid::Uuid::new_v4()));
    let config = crate::ExecConfig {
        scratch_dir: relative.clone(),
        ..Default::default()
    };
    let (service, _) = setup_service(config.clone())?;

    let result = service.execute(ExecutionRequest::new(PYTHON_HELLO)).await;
    let leftovers = scratch_entries(&config).await;
    let _ = std::fs::remove_dir_all(&relative);

    let result = result?;
    assert!(result.is_success(), "unexpected result: {:?}", result);
    assert_eq!(result.stdout, "hi\n");
    assert_eq!(leftovers, 0);
    Ok(())
}
