//! Per-container tag adapters.
//!
//! Each audio container family stores cover art and text metadata in its own
//! native structure (ID3v2 frames, MP4 ilst atoms, FLAC PICTURE blocks,
//! base64 Vorbis comments). One adapter per family implements the same small
//! capability set; dispatch is by file extension.
//!
//! Read operations are soft: a missing tag, missing frame or malformed value
//! is `None`, never an error. Failures opening a file are logged at `warn`
//! and also yield `None`. Adapters keep no state between calls — every
//! operation reopens the file.

pub mod flac;
pub mod generic;
pub mod id3;
pub mod mp4;
pub mod vorbis;

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use lofty::config::{ParseOptions, ParsingMode, WriteOptions};
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag, TagType};
use log::warn;
use regex::Regex;

use crate::artwork::NormalizedCover;
use crate::errors::{AppError, Result};

static LEADING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+").expect("valid regex"));

/// Container family, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Mp3,
    Mp4,
    Flac,
    Vorbis,
    Generic,
}

impl FormatKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "mp3" => FormatKind::Mp3,
            "m4a" | "mp4" => FormatKind::Mp4,
            "flac" => FormatKind::Flac,
            "ogg" | "opus" => FormatKind::Vorbis,
            _ => FormatKind::Generic,
        }
    }
}

/// Embedded cover art as read from a container, before normalization.
#[derive(Debug, Clone)]
pub struct CoverArt {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Capability set every container adapter provides.
pub trait TagAdapter: Send + Sync {
    fn read_cover(&self, path: &Path) -> Option<CoverArt>;
    fn read_track_number(&self, path: &Path) -> Option<u32>;
    fn read_title(&self, path: &Path) -> Option<String>;
    fn read_album(&self, path: &Path) -> Option<String>;
    fn embed_cover(&self, path: &Path, cover: &NormalizedCover, backup: bool) -> Result<()>;
}

pub fn adapter_for(kind: FormatKind) -> &'static dyn TagAdapter {
    match kind {
        FormatKind::Mp3 => &id3::Id3Adapter,
        FormatKind::Mp4 => &mp4::Mp4Adapter,
        FormatKind::Flac => &flac::FlacAdapter,
        FormatKind::Vorbis => &vorbis::VorbisAdapter,
        FormatKind::Generic => &generic::GenericAdapter,
    }
}

pub(crate) fn parse_opts() -> ParseOptions {
    ParseOptions::new()
        .read_cover_art(true)
        .parsing_mode(ParsingMode::BestAttempt)
}

/// Open `path` and pull out its tag of the given native type, if any.
pub(crate) fn read_native_tag(path: &Path, tag_type: TagType) -> Option<Tag> {
    let tagged_file = match Probe::open(path)
        .map(|p| p.options(parse_opts()))
        .and_then(|p| p.read())
    {
        Ok(f) => f,
        Err(e) => {
            warn!("failed to read tags from {}: {e}", path.display());
            return None;
        }
    };
    tagged_file.tag(tag_type).cloned()
}

/// First embedded picture with its declared MIME type.
pub(crate) fn first_picture(tag: &Tag) -> Option<CoverArt> {
    let picture = tag.pictures().first()?;
    Some(CoverArt {
        data: picture.data().to_vec(),
        mime_type: declared_mime(picture.mime_type()).to_string(),
    })
}

pub(crate) fn declared_mime(mime: Option<&MimeType>) -> &str {
    match mime {
        Some(MimeType::Jpeg) => "image/jpeg",
        Some(MimeType::Png) => "image/png",
        Some(MimeType::Gif) => "image/gif",
        Some(MimeType::Bmp) => "image/bmp",
        Some(MimeType::Tiff) => "image/tiff",
        Some(MimeType::Unknown(s)) => s,
        _ => "image/jpeg",
    }
}

/// Sniff a cover's MIME from its leading magic bytes (JPEG SOI, else PNG).
pub(crate) fn sniff_image_mime(data: &[u8]) -> &'static str {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else {
        "image/png"
    }
}

/// Track number as the numeric prefix of the tag's track text, falling back
/// to the parsed accessor (which handles MP4's binary pair atom).
pub(crate) fn track_from_tag(tag: &Tag) -> Option<u32> {
    if let Some(text) = tag.get_string(&ItemKey::TrackNumber) {
        if let Some(m) = LEADING_DIGITS.find(text) {
            if let Ok(n) = m.as_str().parse() {
                return Some(n);
            }
        }
    }
    tag.track()
}

pub(crate) fn title_from_tag(tag: &Tag) -> Option<String> {
    tag.title().map(|t| t.to_string())
}

pub(crate) fn album_from_tag(tag: &Tag) -> Option<String> {
    tag.album().map(|a| a.to_string())
}

/// Replace every embedded picture with a single front cover built from the
/// normalized JPEG, then persist the tag.
pub(crate) fn write_front_cover(
    path: &Path,
    tag_type: TagType,
    cover: &NormalizedCover,
    backup: bool,
) -> Result<()> {
    if backup {
        backup_original(path);
    }

    let mut tagged_file = Probe::open(path)
        .map_err(|e| AppError::TagWrite(format!("failed to open {}: {e}", path.display())))?
        .options(parse_opts())
        .read()
        .map_err(|e| AppError::TagWrite(format!("failed to read {}: {e}", path.display())))?;

    let tag = match tagged_file.tag_mut(tag_type) {
        Some(t) => t,
        None => {
            tagged_file.insert_tag(Tag::new(tag_type));
            tagged_file.tag_mut(tag_type).ok_or_else(|| {
                AppError::TagWrite(format!(
                    "{} does not accept {tag_type:?} tags",
                    path.display()
                ))
            })?
        }
    };

    clear_pictures(tag);
    tag.push_picture(front_cover_picture(cover));

    // ID3v2.3 for the widest player compatibility; ignored by non-ID3 tags.
    tag.save_to_path(path, WriteOptions::default().use_id3v23(true))
        .map_err(|e| AppError::TagWrite(format!("failed to write {}: {e}", path.display())))
}

fn front_cover_picture(cover: &NormalizedCover) -> Picture {
    Picture::new_unchecked(
        PictureType::CoverFront,
        Some(MimeType::Jpeg),
        None,
        cover.data.clone(),
    )
}

fn clear_pictures(tag: &mut Tag) {
    loop {
        let Some(pic_type) = tag.pictures().first().map(|p| p.pic_type()) else {
            break;
        };
        tag.remove_picture_type(pic_type);
    }
}

/// Copy `path` to a `{stem}_backup{ext}` sibling unless that backup already
/// exists. A failed copy is logged but never blocks the embed.
pub(crate) fn backup_original(path: &Path) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let backup = path.with_file_name(format!("{stem}_backup{ext}"));
    if backup.exists() {
        return;
    }
    if let Err(e) = fs::copy(path, &backup) {
        warn!("failed to back up {}: {e}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn dispatch_partitions_extensions() {
        let cases = [
            ("song.mp3", FormatKind::Mp3),
            ("song.MP3", FormatKind::Mp3),
            ("song.m4a", FormatKind::Mp4),
            ("song.mp4", FormatKind::Mp4),
            ("song.flac", FormatKind::Flac),
            ("song.ogg", FormatKind::Vorbis),
            ("song.OPUS", FormatKind::Vorbis),
            ("song.wav", FormatKind::Generic),
            ("song.wma", FormatKind::Generic),
            ("song", FormatKind::Generic),
        ];
        for (name, kind) in cases {
            assert_eq!(FormatKind::from_path(&PathBuf::from(name)), kind, "{name}");
        }
    }

    #[test]
    fn mime_sniffing_distinguishes_jpeg_from_png() {
        assert_eq!(sniff_image_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_image_mime(&[0x89, b'P', b'N', b'G']), "image/png");
        assert_eq!(sniff_image_mime(&[]), "image/png");
    }

    #[test]
    fn id3_writes_use_legacy_tag_version() {
        let cover = NormalizedCover {
            data: vec![0xFF, 0xD8, 0xFF, 0xE0],
            width: 1,
            height: 1,
            depth: 24,
        };
        let mut tag = Tag::new(TagType::Id3v2);
        tag.push_picture(front_cover_picture(&cover));

        let mut buf = std::io::Cursor::new(Vec::new());
        tag.dump_to(&mut buf, WriteOptions::default().use_id3v23(true))
            .expect("dump id3v2 tag");

        let bytes = buf.into_inner();
        assert_eq!(&bytes[..3], b"ID3");
        assert_eq!(bytes[3], 3, "major version byte");
    }

    #[test]
    fn reads_on_unparseable_files_are_soft() {
        let adapter = adapter_for(FormatKind::Mp3);
        let missing = PathBuf::from("does/not/exist.mp3");
        assert!(adapter.read_cover(&missing).is_none());
        assert!(adapter.read_track_number(&missing).is_none());
        assert!(adapter.read_title(&missing).is_none());
        assert!(adapter.read_album(&missing).is_none());
    }
}
