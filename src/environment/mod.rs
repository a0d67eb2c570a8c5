//! Execution environments and their collaborators
//!
//! The engine never runs anything on the bare host directly: it asks an
//! [`EnvironmentProvisioner`] for an isolated context first, and populates
//! that context through a [`SourceControl`] implementation.

use crate::error::JobError;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};
use uuid::Uuid;

/// Handle to one provisioned execution context.
///
/// Every step of a job runs against the same environment; independent jobs
/// get independent environments.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Declared image reference this environment was provisioned for
    pub image: String,

    /// Working directory all steps execute in
    pub workspace: PathBuf,

    /// Variables exported to every step's process
    pub env_vars: HashMap<String, String>,
}

/// Provisions isolated execution contexts from an image reference.
#[async_trait::async_trait]
pub trait EnvironmentProvisioner: Send + Sync {
    async fn provision(&self, image: &str) -> Result<Environment, JobError>;
}

/// Provisions a fresh workspace directory per run on the local host.
///
/// The image reference is recorded on the environment but not pulled;
/// container-backed provisioners plug in behind the same trait.
pub struct LocalProvisioner {
    root: PathBuf,
}

impl LocalProvisioner {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait::async_trait]
impl EnvironmentProvisioner for LocalProvisioner {
    async fn provision(&self, image: &str) -> Result<Environment, JobError> {
        if image.trim().is_empty() {
            return Err(JobError::Environment(
                "empty image reference".to_string(),
            ));
        }

        let workspace = self.root.join(format!("run-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&workspace).await.map_err(|e| {
            JobError::Environment(format!(
                "failed to create workspace {}: {}",
                workspace.display(),
                e
            ))
        })?;

        info!("Provisioned workspace {} for image {}", workspace.display(), image);

        let mut env_vars = HashMap::new();
        env_vars.insert("CI".to_string(), "true".to_string());

        Ok(Environment {
            image: image.to_string(),
            workspace,
            env_vars,
        })
    }
}

/// Populates an environment's workspace from source control.
#[async_trait::async_trait]
pub trait SourceControl: Send + Sync {
    async fn checkout(&self, env: &Environment) -> Result<(), JobError>;
}

/// Checkout for jobs whose workspace is already populated (or needs nothing).
pub struct NoCheckout;

#[async_trait::async_trait]
impl SourceControl for NoCheckout {
    async fn checkout(&self, env: &Environment) -> Result<(), JobError> {
        debug!("No repository configured, leaving {} as-is", env.workspace.display());
        Ok(())
    }
}

/// Checkout that clones a git repository into the workspace.
pub struct GitCheckout {
    url: String,
    reference: Option<String>,
}

impl GitCheckout {
    pub fn new(url: impl Into<String>, reference: Option<String>) -> Self {
        Self {
            url: url.into(),
            reference,
        }
    }
}

#[async_trait::async_trait]
impl SourceControl for GitCheckout {
    async fn checkout(&self, env: &Environment) -> Result<(), JobError> {
        info!("Cloning {} into {}", self.url, env.workspace.display());

        let mut cmd = tokio::process::Command::new("git");
        cmd.arg("clone").arg("--depth").arg("1");
        if let Some(reference) = &self.reference {
            cmd.arg("--branch").arg(reference);
        }
        cmd.arg(&self.url)
            .arg(".")
            .current_dir(&env.workspace)
            .kill_on_drop(true);

        let output = cmd
            .output()
            .await
            .map_err(|e| JobError::Checkout(format!("failed to run git: {}", e)))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(JobError::Checkout(stderr.trim().to_string()))
        }
    }
}
