use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extensions recognized during directory discovery.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "mp4", "flac", "ogg", "opus", "wav", "aac", "wma",
];

/// All processing options for a run.
///
/// Carried explicitly through the pipeline instead of living in module-level
/// state so the core stays testable.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProcessOptions {
    pub do_embed: bool,
    pub do_rename: bool,
    pub backup: bool,
    pub dry_run: bool,
    pub workers: usize,
    pub target_width: u32,
    pub jpeg_quality: u8,
    pub extensions: Vec<String>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            do_embed: true,
            do_rename: false,
            backup: false,
            dry_run: false,
            workers: 4,
            target_width: 600,
            jpeg_quality: 95,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ProcessOptions {
    /// Whether `path` carries one of the recognized audio extensions
    /// (case-insensitive).
    pub fn is_audio_file(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let ext = ext.to_ascii_lowercase();
        self.extensions.iter().any(|e| e == &ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn recognizes_extensions_case_insensitively() {
        let options = ProcessOptions::default();
        assert!(options.is_audio_file(&PathBuf::from("a/b/track.MP3")));
        assert!(options.is_audio_file(&PathBuf::from("track.Flac")));
        assert!(options.is_audio_file(&PathBuf::from("track.opus")));
        assert!(!options.is_audio_file(&PathBuf::from("cover.jpg")));
        assert!(!options.is_audio_file(&PathBuf::from("noext")));
    }
}
