//! Filename and folder-name derivation from tag metadata.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::ProcessOptions;
use crate::formats;

const MAX_NAME_LEN: usize = 200;

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w \-\.()\[\]]+").expect("valid regex"));
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Sanitize a tag value for use as a file or folder name.
///
/// Path separators become underscores; anything outside
/// letters/digits/underscore/space/hyphen/dot/parens/brackets is stripped;
/// whitespace runs collapse to a single space; the result is capped at 200
/// characters with trailing whitespace trimmed.
pub fn sanitize_filename(s: &str) -> String {
    let s = s.trim().replace(['/', '\\'], "_");
    let s = DISALLOWED.replace_all(&s, "");
    let s = WHITESPACE_RUN.replace_all(&s, " ");
    if s.chars().count() > MAX_NAME_LEN {
        s.chars().take(MAX_NAME_LEN).collect::<String>().trim_end().to_string()
    } else {
        s.into_owned()
    }
}

/// Derive `"{NN}. {title}{ext}"` from a track number and title.
/// `ext` includes the leading dot.
pub fn track_file_name(track: u32, title: &str, ext: &str) -> String {
    format!("{:02}. {}{}", track, sanitize_filename(title), ext)
}

/// Find a free sibling of `target`, appending `_1`, `_2`, … before the
/// extension. A path that is the same file as `original` does not count as a
/// collision, so renaming a file onto its own name is a no-op.
pub fn resolve_collision(target: &Path, original: &Path) -> PathBuf {
    if !collides(target, original) {
        return target.to_path_buf();
    }

    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = target
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let parent = target.parent().unwrap_or_else(|| Path::new(""));

    let mut count = 1;
    loop {
        let candidate = parent.join(format!("{stem}_{count}{ext}"));
        if !collides(&candidate, original) {
            return candidate;
        }
        count += 1;
    }
}

/// Find a free directory name, appending `_1`, `_2`, … to the whole name.
/// Directory names are not split on dots.
pub fn resolve_dir_collision(target: &Path) -> PathBuf {
    if !target.exists() {
        return target.to_path_buf();
    }
    let name = target
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = target.parent().unwrap_or_else(|| Path::new(""));

    let mut count = 1;
    loop {
        let candidate = parent.join(format!("{name}_{count}"));
        if !candidate.exists() {
            return candidate;
        }
        count += 1;
    }
}

fn collides(candidate: &Path, original: &Path) -> bool {
    candidate.exists() && !is_same_file(candidate, original)
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

/// Pick the most frequent non-empty value, trimming each candidate.
/// Ties break toward the value encountered first.
pub fn majority_vote<I, S>(values: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut order = 0usize;
    for value in values {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        let entry = counts.entry(trimmed.to_string()).or_insert((0, order));
        entry.0 += 1;
        order += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (ca, fa)), (_, (cb, fb))| ca.cmp(cb).then(fb.cmp(fa)))
        .map(|(value, _)| value)
}

/// Majority album name across the audio files directly inside `folder`.
/// Files in nested subdirectories do not vote.
pub fn majority_album(folder: &Path, options: &ProcessOptions) -> Option<String> {
    let entries = fs::read_dir(folder).ok()?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && options.is_audio_file(p))
        .collect();
    // Stable order keeps the first-encountered tie-break deterministic.
    files.sort();

    let albums = files.iter().filter_map(|path| {
        formats::adapter_for(formats::FormatKind::from_path(path)).read_album(path)
    });
    majority_vote(albums)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn sanitize_strips_punctuation_and_collapses_whitespace() {
        assert_eq!(sanitize_filename("My Song!"), "My Song");
        assert_eq!(sanitize_filename("  a/b\\c  "), "a_b_c");
        // The tab is a disallowed character and is removed before the
        // space-collapse pass, so no separator survives between the words.
        assert_eq!(sanitize_filename("one   two\tthree"), "one twothree");
        assert_eq!(sanitize_filename("Keep (this) [and] - .that"), "Keep (this) [and] - .that");
    }

    #[test]
    fn sanitize_truncates_to_200_chars_trimming_trailing_space() {
        let long = format!("{} {}", "x".repeat(199), "y".repeat(50));
        let out = sanitize_filename(&long);
        assert_eq!(out.chars().count(), 199);
        assert!(!out.ends_with(' '));
    }

    #[test]
    fn track_file_name_zero_pads_and_sanitizes() {
        assert_eq!(track_file_name(7, "My Song!", ".mp3"), "07. My Song.mp3");
        assert_eq!(track_file_name(12, "Plain", ".flac"), "12. Plain.flac");
    }

    #[test]
    fn resolve_collision_appends_suffix_until_free() {
        let dir = tempdir().expect("tempdir");
        let original = dir.path().join("old.mp3");
        File::create(&original).expect("create");
        let taken = dir.path().join("01. Song.mp3");
        File::create(&taken).expect("create");
        let also_taken = dir.path().join("01. Song_1.mp3");
        File::create(&also_taken).expect("create");

        let free = resolve_collision(&taken, &original);
        assert_eq!(free, dir.path().join("01. Song_2.mp3"));
        assert!(!free.exists());
    }

    #[test]
    fn resolve_collision_ignores_the_original_file_itself() {
        let dir = tempdir().expect("tempdir");
        let original = dir.path().join("07. Same.mp3");
        File::create(&original).expect("create");

        let target = dir.path().join("07. Same.mp3");
        assert_eq!(resolve_collision(&target, &original), target);
    }

    #[test]
    fn resolve_dir_collision_suffixes_whole_name() {
        let dir = tempdir().expect("tempdir");
        let taken = dir.path().join("Best.Of");
        fs::create_dir(&taken).expect("mkdir");
        assert_eq!(resolve_dir_collision(&taken), dir.path().join("Best.Of_1"));
    }

    #[test]
    fn majority_vote_prefers_most_frequent_then_first_seen() {
        assert_eq!(majority_vote(["Foo", "Foo", "Bar"]), Some("Foo".to_string()));
        assert_eq!(majority_vote(["A", "B"]), Some("A".to_string()));
        assert_eq!(majority_vote([" Foo ", "Foo"]), Some("Foo".to_string()));
        assert_eq!(majority_vote(Vec::<String>::new()), None);
        assert_eq!(majority_vote(["", "  "]), None);
    }

    #[test]
    fn majority_album_on_empty_folder_is_none() {
        let dir = tempdir().expect("tempdir");
        assert_eq!(majority_album(dir.path(), &ProcessOptions::default()), None);
    }
}
