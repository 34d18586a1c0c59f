//! Deterministic archive-relative path derivation.
//!
//! `partition_path` is the single source of truth for where an imported
//! file's bytes live under an archive root (`originals`, `playback`,
//! `thumbnails`). Keeping it pure and dependency-free lets the Metadata
//! Refresher (spec §4.3) and the File Importer (spec §4.5) agree on the
//! canonical path without sharing mutable state.

use chrono::{DateTime, Utc};

/// Fallback partition used when a file carries no usable capture time.
pub const UNKNOWN_PARTITION: &str = "unknown";

/// Sanitize a filename stem: keep alphanumerics, `-`, `_`, replace
/// everything else with `_`, and never return an empty string.
pub fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Build the `YYYY/MM/DD` partition for a shot-at timestamp, or the
/// `unknown` fallback when none is available.
pub fn partition_for(shot_at: Option<DateTime<Utc>>) -> String {
    match shot_at {
        Some(dt) => dt.format("%Y/%m/%d").to_string(),
        None => UNKNOWN_PARTITION.to_string(),
    }
}

/// Derive the archive-relative path (`YYYY/MM/DD/<base>.<ext>`, or
/// `unknown/<base>.<ext>`) for a file, disambiguating against a caller
/// supplied `is_claimed` predicate so that two distinct analyses never
/// collide within the same day's partition. The predicate is deliberately
/// abstract over what "claimed" means — an in-memory set for a batch held
/// entirely in memory, or a filesystem existence check against the
/// archive root for a sequential scan — so callers decide the source of
/// truth rather than this function.
pub fn relative_path_for(
    shot_at: Option<DateTime<Utc>>,
    stem: &str,
    extension: &str,
    is_claimed: &dyn Fn(&str) -> bool,
) -> String {
    let partition = partition_for(shot_at);
    let stem = sanitize_stem(stem);
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();

    let mut candidate = format!("{partition}/{stem}.{ext}");
    let mut suffix = 1u32;
    while is_claimed(&candidate) {
        candidate = format!("{partition}/{stem}_{suffix}.{ext}");
        suffix += 1;
    }
    candidate
}

/// Replace a relative path's extension, preserving its directory/stem.
pub fn replace_suffix(relative_path: &str, new_ext: &str) -> String {
    let new_ext = new_ext.trim_start_matches('.');
    match relative_path.rsplit_once('.') {
        Some((base, _old_ext)) => format!("{base}.{new_ext}"),
        None => format!("{relative_path}.{new_ext}"),
    }
}

/// Rebase a sibling path (e.g. a `MediaPlayback.rel_path`) onto a new
/// parent directory while preserving its own stem and extension — used by
/// the Metadata Refresher when relocating playback assets (spec §4.3,
/// invariant P5d: same parent directory and base stem as the new path).
pub fn rebase_sibling(old_sibling: &str, new_media_path: &str) -> String {
    let new_parent = new_media_path.rsplit_once('/').map(|(p, _)| p).unwrap_or("");
    let new_stem = new_media_path
        .rsplit_once('/')
        .map(|(_, f)| f)
        .unwrap_or(new_media_path)
        .rsplit_once('.')
        .map(|(s, _)| s)
        .unwrap_or(new_media_path);

    let old_file = old_sibling.rsplit_once('/').map(|(_, f)| f).unwrap_or(old_sibling);
    let old_ext = old_file.rsplit_once('.').map(|(_, e)| e).unwrap_or("");

    if new_parent.is_empty() {
        format!("{new_stem}.{old_ext}")
    } else {
        format!("{new_parent}/{new_stem}.{old_ext}")
    }
}

/// Forward-slash normalization for any path persisted in the DB (spec
/// §4.8: "rel_path and poster_rel_path are stored with forward slashes
/// regardless of host OS").
pub fn normalize_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn partitions_by_date() {
        let dt = Utc.with_ymd_and_hms(2024, 5, 1, 3, 34, 56).unwrap();
        assert_eq!(partition_for(Some(dt)), "2024/05/01");
    }

    #[test]
    fn falls_back_when_no_shot_at() {
        assert_eq!(partition_for(None), "unknown");
    }

    #[test]
    fn disambiguates_collisions() {
        use std::collections::HashSet;

        let dt = Utc.with_ymd_and_hms(2024, 5, 1, 3, 34, 56).unwrap();
        let mut claimed = HashSet::new();
        let first = relative_path_for(Some(dt), "a", "jpg", &|c| claimed.contains(c));
        claimed.insert(first.clone());
        let second = relative_path_for(Some(dt), "a", "jpg", &|c| claimed.contains(c));
        assert_ne!(first, second);
        assert_eq!(second, "2024/05/01/a_1.jpg");
    }

    #[test]
    fn replaces_suffix() {
        assert_eq!(replace_suffix("2024/05/01/a.mov", "mp4"), "2024/05/01/a.mp4");
    }

    #[test]
    fn rebases_sibling_paths() {
        let rebased = rebase_sibling("2024/05/01/a.mp4", "2024/08/18/a.jpg");
        assert_eq!(rebased, "2024/08/18/a.mp4");
    }

    #[test]
    fn normalizes_backslashes() {
        assert_eq!(normalize_slashes("2024\\05\\01\\a.mp4"), "2024/05/01/a.mp4");
    }
}
