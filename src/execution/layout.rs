//! Filesystem layout of a local compute resource environment.
//!
//! ```text
//! <build_dir>/
//! ├── repo/          central repository, shared by all tickets
//! └── <ticket_id>/   per-ticket scratch directory, created by the execution task
//! <work_dir>/        resolution root for relative ticket inputs
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::constants::CENTRAL_REPO_DIR;
use crate::error::{CreError, CreResult, DirectoryRole};

/// Validated directory paths owned by a compute resource environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DirectoryLayout {
    build_dir: PathBuf,
    work_dir: PathBuf,
    central_repo: PathBuf,
}

impl DirectoryLayout {
    /// Validate both directories without touching the filesystem
    ///
    /// The build directory is checked before the work directory.
    pub(crate) fn validate(build_dir: &Path, work_dir: &Path) -> CreResult<Self> {
        validate_directory(DirectoryRole::Build, build_dir)?;
        validate_directory(DirectoryRole::Work, work_dir)?;

        Ok(Self {
            build_dir: build_dir.to_path_buf(),
            work_dir: work_dir.to_path_buf(),
            central_repo: build_dir.join(CENTRAL_REPO_DIR),
        })
    }

    /// Create the central repository with missing parents unless it exists
    ///
    /// Idempotent; an existing repository is left untouched.
    pub(crate) fn ensure_central_repo(&self) -> CreResult<()> {
        if self.central_repo.is_dir() {
            debug!(path = %self.central_repo.display(), "Central repository already present");
            return Ok(());
        }

        fs::create_dir_all(&self.central_repo).map_err(|e| CreError::RepositoryCreationFailed {
            path: self.central_repo.display().to_string(),
            reason: e.to_string(),
        })?;

        info!(path = %self.central_repo.display(), "Created central repository");
        Ok(())
    }

    pub(crate) fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub(crate) fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub(crate) fn central_repo(&self) -> &Path {
        &self.central_repo
    }
}

/// Scratch directory for a single ticket under the build directory
pub(crate) fn ticket_dir(build_dir: &Path, ticket_id: Uuid) -> PathBuf {
    build_dir.join(ticket_id.to_string())
}

fn validate_directory(role: DirectoryRole, path: &Path) -> CreResult<()> {
    if path.as_os_str().is_empty() {
        return Err(CreError::empty_directory_path(role));
    }
    if !path.exists() {
        return Err(CreError::missing_directory(role, path));
    }
    if !path.is_dir() {
        return Err(CreError::not_a_directory(role, path));
    }
    Ok(())
}
