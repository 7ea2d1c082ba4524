use std::collections::HashSet;
use std::time::Duration;

use tracing::{info, warn};

use podium_api::{AppState, storage};

/// Files younger than this are never swept; their DB rows may still be in
/// flight in a concurrent upload.
const MIN_ORPHAN_AGE: Duration = Duration::from_secs(3600);

/// Background task that removes orphaned photo files.
///
/// Cascade deletes drop `report_photos` rows without touching the files
/// they point at. Each pass diffs the photo directory against the stored
/// URLs and removes files no row references anymore.
pub async fn run_cleanup_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match sweep_orphans(&state).await {
            Ok(count) => {
                if count > 0 {
                    info!("Cleanup: removed {} orphaned photo file(s)", count);
                }
            }
            Err(e) => {
                warn!("Cleanup error: {:#}", e);
            }
        }
    }
}

async fn sweep_orphans(state: &AppState) -> anyhow::Result<usize> {
    let db_state = state.clone();
    let urls = tokio::task::spawn_blocking(move || db_state.db.all_photo_urls()).await??;
    let referenced: HashSet<&str> = urls
        .iter()
        .filter_map(|url| storage::url_file_name(url))
        .collect();

    let mut removed = 0;
    for name in state.storage.list_photo_files().await? {
        if referenced.contains(name.as_str()) {
            continue;
        }
        match state.storage.photo_age(&name).await {
            Ok(age) if age >= MIN_ORPHAN_AGE => {
                state.storage.delete_photo(&name).await?;
                removed += 1;
            }
            // Fresh file, or it raced with another delete; leave it be.
            Ok(_) | Err(_) => {}
        }
    }
    Ok(removed)
}
