use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Subdirectory of the upload root where report photos land.
const REPORTS_SUBDIR: &str = "reports";

/// Longest stored file name we derive from a client-supplied name.
const MAX_NAME_LEN: usize = 64;

/// On-disk photo storage.
///
/// Photos live flat under `{root}/reports/` and are served statically at
/// `/uploads/reports/{name}` by the router. Rows in `report_photos` hold
/// the URL form; the cleanup task compares the two to find orphans.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Create the storage, making sure the photo directory exists.
    pub async fn new(root: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(root.join(REPORTS_SUBDIR)).await?;
        info!("Photo storage directory: {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn photo_path(&self, file_name: &str) -> PathBuf {
        self.root.join(REPORTS_SUBDIR).join(file_name)
    }

    pub async fn save_photo(&self, file_name: &str, data: &[u8]) -> io::Result<()> {
        let path = self.photo_path(file_name);
        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }

    /// Delete a stored photo. A file that is already gone is not an error.
    pub async fn delete_photo(&self, file_name: &str) -> io::Result<()> {
        match fs::remove_file(self.photo_path(file_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Photo {} already gone from disk", file_name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Names of all photo files currently on disk.
    pub async fn list_photo_files(&self) -> io::Result<Vec<String>> {
        let mut entries = fs::read_dir(self.root.join(REPORTS_SUBDIR)).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// Time since the photo file was last written. The cleanup task uses
    /// this to leave fresh uploads alone while their DB rows are in flight.
    pub async fn photo_age(&self, file_name: &str) -> io::Result<Duration> {
        let meta = fs::metadata(self.photo_path(file_name)).await?;
        let modified = meta.modified()?;
        Ok(modified.elapsed().unwrap_or_default())
    }
}

/// Stored file name for an uploaded photo: report id, upload timestamp and
/// position in the batch keep concurrent uploads from colliding, the
/// sanitized client name keeps the file recognizable.
pub fn photo_file_name(report_id: &str, millis: i64, index: usize, original: &str) -> String {
    format!("{}_{}_{}_{}", report_id, millis, index, sanitize(original))
}

/// Public URL under which a stored photo is served.
pub fn photo_url(file_name: &str) -> String {
    format!("/uploads/{}/{}", REPORTS_SUBDIR, file_name)
}

/// File name of a stored photo, recovered from its URL form.
pub fn url_file_name(photo_url: &str) -> Option<&str> {
    photo_url.rsplit('/').next()
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        return "photo".to_string();
    }
    if cleaned.len() > MAX_NAME_LEN {
        // All-ASCII after the map above, so byte slicing is safe. Keep the
        // tail so the extension survives.
        cleaned[cleaned.len() - MAX_NAME_LEN..].to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize("lauf 5km.jpg"), "lauf_5km.jpg");
        assert_eq!(sanitize("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize("photo_0.jpg"), "photo_0.jpg");
    }

    #[test]
    fn sanitize_handles_empty_and_long_names() {
        assert_eq!(sanitize(""), "photo");

        let long = format!("{}.jpg", "a".repeat(100));
        let cleaned = sanitize(&long);
        assert_eq!(cleaned.len(), MAX_NAME_LEN);
        assert!(cleaned.ends_with(".jpg"));
    }

    #[test]
    fn file_names_round_trip_through_urls() {
        let name = photo_file_name("r-1", 1700000000000, 0, "run.jpg");
        assert_eq!(name, "r-1_1700000000000_0_run.jpg");

        let url = photo_url(&name);
        assert_eq!(url, "/uploads/reports/r-1_1700000000000_0_run.jpg");
        assert_eq!(url_file_name(&url), Some(name.as_str()));
    }
}
