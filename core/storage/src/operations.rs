//! Listing and single-file copy between filesystem handles.

use tracing::{debug, info};

use cloudferry_common::{Error, Result};

use crate::fs::{DirEntry, Fs, RootKind};
use crate::provider::Metadata;

/// List the root of `fs`, non-recursively.
///
/// # Errors
/// - Root does not exist
/// - Backend failures
pub async fn list(fs: &Fs) -> Result<Vec<DirEntry>> {
    let entries = fs.list().await?;
    debug!(remote = fs.name(), root = %fs.root(), count = entries.len(), "Listed");
    Ok(entries)
}

/// Copy the file `src_remote` of `src` to `dst_remote` of `dst`.
///
/// Remote paths are relative to each handle's root; an empty remote names
/// the root itself. An existing destination file is updated in place and is
/// never deleted. Copying a file onto itself does nothing.
///
/// # Preconditions
/// - The destination's parent directory must exist
///
/// # Errors
/// - Source missing or a directory
/// - Destination is a directory
/// - Backend failures on either side
pub async fn copy_file(dst: &Fs, src: &Fs, dst_remote: &str, src_remote: &str) -> Result<Metadata> {
    let src_path = src.path_of(src_remote);
    let dst_path = dst.path_of(dst_remote);

    let source = src.provider().metadata(&src_path).await?;
    if source.is_directory {
        return Err(Error::InvalidInput(format!(
            "can't copy a directory: {}",
            src_path
        )));
    }

    let same_remote = dst.same_remote(src);
    if same_remote && src_path == dst_path {
        debug!(path = %src_path, "Source and destination are the same file");
        return Ok(source);
    }

    let dst_exists = match dst.provider().metadata(&dst_path).await {
        Ok(existing) if existing.is_directory => {
            return Err(Error::InvalidInput(format!(
                "destination is a directory: {}",
                dst_path
            )));
        }
        Ok(_) => true,
        Err(Error::NotFound(_)) => false,
        Err(e) => return Err(e),
    };

    let metadata = if same_remote && !dst_exists {
        debug!(from = %src_path, to = %dst_path, "Server-side copy");
        dst.provider().copy(&src_path, &dst_path).await?
    } else {
        debug!(from = %src_path, to = %dst_path, replace = dst_exists, "Streaming copy");
        let stream = src.provider().download_stream(&src_path).await?;
        dst.provider().upload_stream(&dst_path, stream).await?
    };

    info!(
        from = %format!("{}:{}", src.name(), src_path),
        to = %format!("{}:{}", dst.name(), dst_path),
        size = ?metadata.size,
        "File copied"
    );
    Ok(metadata)
}

/// Copy the single file addressed by `src` to wherever `dst` points.
///
/// The source is the file the handle was opened on, or its root. The target
/// depends on what the destination root was when opened:
/// - a file: it is overwritten
/// - a directory: the file lands inside it under the source name
/// - missing: the root itself is the new file's path
///
/// # Errors
/// - Everything [`copy_file`] reports
pub async fn copy_single(dst: &Fs, src: &Fs) -> Result<Metadata> {
    let src_remote = match src.kind() {
        RootKind::File(leaf) => leaf.as_str(),
        RootKind::Directory | RootKind::Missing => "",
    };

    let dst_remote = match dst.kind() {
        RootKind::File(leaf) => leaf.clone(),
        RootKind::Directory => src
            .path_of(src_remote)
            .name()
            .ok_or_else(|| Error::InvalidInput("can't copy a directory: /".to_string()))?
            .to_string(),
        RootKind::Missing => String::new(),
    };

    copy_file(dst, src, &dst_remote, src_remote).await
}
