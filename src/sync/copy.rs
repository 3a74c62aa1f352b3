use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use super::error::SyncError;
use super::executor::CommandExecutor;

/// Replace `dst` with a recursive copy of `src`.
///
/// Tries `cp -r src/. dst/` first and falls back to walking the tree, copying
/// file and directory permissions along the way.
pub fn copy_directory(
    executor: &dyn CommandExecutor,
    src: &Path,
    dst: &Path,
) -> Result<(), SyncError> {
    if dst.exists() {
        fs::remove_dir_all(dst).map_err(|e| SyncError::io("remove", dst, e))?;
    }
    fs::create_dir_all(dst).map_err(|e| SyncError::io("create", dst, e))?;

    let src_arg = format!("{}/.", src.display());
    let dst_arg = format!("{}/", dst.display());
    match executor.execute("cp", &["-r", &src_arg, &dst_arg]) {
        Ok(output) if output.success() => return Ok(()),
        Ok(output) => tracing::debug!(
            exit_code = output.exit_code,
            stderr = %output.stderr.trim(),
            "cp failed, copying manually"
        ),
        Err(err) => tracing::debug!(error = %err, "cp unavailable, copying manually"),
    }

    copy_tree(src, dst)
}

fn copy_tree(src: &Path, dst: &Path) -> Result<(), SyncError> {
    let root = fs::metadata(src).map_err(|e| SyncError::io("stat", src, e))?;
    fs::set_permissions(dst, root.permissions()).map_err(|e| SyncError::io("chmod", dst, e))?;

    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            SyncError::io("walk", path, e.into())
        })?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| {
                SyncError::io(
                    "walk",
                    entry.path(),
                    std::io::Error::new(std::io::ErrorKind::Other, "entry outside source tree"),
                )
            })?;
        let target = dst.join(relative);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| SyncError::io("create", &target, e))?;
            let meta = entry
                .metadata()
                .map_err(|e| SyncError::io("stat", entry.path(), e.into()))?;
            fs::set_permissions(&target, meta.permissions())
                .map_err(|e| SyncError::io("chmod", &target, e))?;
        } else if file_type.is_file() {
            // fs::copy carries the permission bits over
            fs::copy(entry.path(), &target).map_err(|e| SyncError::io("copy", &target, e))?;
        }
    }

    Ok(())
}
