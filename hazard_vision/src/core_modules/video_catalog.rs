// Lists the recorded camera feeds an operator can pick from. Each file is one
// zone; the zone is named after the file stem.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

pub const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "avi", "mkv"];

/// Video files directly under `video_root`, sorted by name. The directory is
/// created if it does not exist yet.
pub fn list_videos(video_root: &Path) -> Result<Vec<PathBuf>, StoreError> {
    fs::create_dir_all(video_root).map_err(|e| StoreError::io(video_root, e))?;
    let entries = fs::read_dir(video_root).map_err(|e| StoreError::io(video_root, e))?;

    let mut videos = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| StoreError::io(video_root, e))?.path();
        let is_video = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| VIDEO_EXTENSIONS.iter().any(|v| ext.eq_ignore_ascii_case(v)));
        if is_video && path.is_file() {
            videos.push(path);
        }
    }
    videos.sort();
    Ok(videos)
}

/// `videos/Entree_Nord.mp4` monitors zone `Entree_Nord`.
pub fn zone_name_for(video: &Path) -> String {
    video
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| video.display().to_string())
}
