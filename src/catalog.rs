use crate::model::Episode;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Reads the episode listing. Relative local urls resolve against the file's directory.
pub fn load_episodes(path: &Path) -> Result<Vec<Episode>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read episode list {}", path.display()))?;
    let mut episodes: Vec<Episode> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse episode list {}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    for episode in &mut episodes {
        episode.url = resolve_url(base, &episode.url);
    }
    Ok(episodes)
}

fn resolve_url(base: &Path, url: &str) -> String {
    if url.contains("://") || Path::new(url).is_absolute() || base.as_os_str().is_empty() {
        return url.to_string();
    }
    base.join(url).to_string_lossy().to_string()
}
