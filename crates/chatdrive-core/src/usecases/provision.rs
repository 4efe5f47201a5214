//! Remote folder provisioning
//!
//! Resolves a [`FolderPath`] to a [`FolderId`], creating missing segments.
//! Each segment is queried before it is created, so sequential calls never
//! duplicate a folder. Concurrent calls racing on the same missing segment
//! can still both create it; nothing locks across deliveries.

use tracing::{debug, info};

use crate::domain::{ConnectionError, FolderId, FolderPath};
use crate::ports::IStorageSession;

/// Walks `path` from the drive root, creating folders that do not exist
///
/// # Errors
/// [`ConnectionError::ProvisionFailed`] if a lookup or create call fails.
/// Folders created before the failure are left in place.
pub async fn resolve_folder(
    session: &dyn IStorageSession,
    path: &FolderPath,
) -> Result<FolderId, ConnectionError> {
    let mut parent = FolderId::root();

    for name in path.segments() {
        let existing = session
            .find_folder(name, &parent)
            .await
            .map_err(ConnectionError::ProvisionFailed)?;

        parent = match existing {
            Some(id) => {
                debug!(folder = %name, id = %id, "Folder exists");
                id
            }
            None => {
                let id = session
                    .create_folder(name, &parent)
                    .await
                    .map_err(ConnectionError::ProvisionFailed)?;
                info!(folder = %name, id = %id, path = %path, "Created folder");
                id
            }
        };
    }

    Ok(parent)
}

/// Looks up `path` without creating anything
///
/// # Returns
/// `None` as soon as a segment is missing
///
/// # Errors
/// [`ConnectionError::QueryFailed`] if a lookup fails
pub async fn find_folder_path(
    session: &dyn IStorageSession,
    path: &FolderPath,
) -> Result<Option<FolderId>, ConnectionError> {
    let mut parent = FolderId::root();

    for name in path.segments() {
        match session
            .find_folder(name, &parent)
            .await
            .map_err(ConnectionError::QueryFailed)?
        {
            Some(id) => parent = id,
            None => return Ok(None),
        }
    }

    Ok(Some(parent))
}
