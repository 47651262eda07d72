// src/atomic_file.rs
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::fs;

/// Sibling temp path: `<name>.tmp` next to the destination.
fn temp_path(dest: &Path) -> PathBuf {
    let mut name: OsString = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    dest.with_file_name(name)
}

/// Write `bytes` to `dest` via temp file + rename, so readers see either
/// the old file or the complete new one.
pub async fn write_atomic(dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let tmp = temp_path(dest);
    if let Err(e) = fs::write(&tmp, bytes).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    if let Err(e) = fs::rename(&tmp, dest).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replaces_content_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("out.geojson");
        write_atomic(&dest, b"one").await.unwrap();
        write_atomic(&dest, b"two").await.unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "two");
        assert!(!temp_path(&dest).exists());
    }
}
