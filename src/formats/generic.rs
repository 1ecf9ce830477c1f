//! Fallback adapter for extensions without a dedicated adapter (wav, aac,
//! wma, ...). Reads go through a format-sniffing probe; the write path is an
//! explicit capability check — containers that accept ID3v2 reuse that write
//! path, everything else is reported as unsupported and left untouched.

use std::path::Path;

use lofty::file::{TaggedFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::TagType;
use log::warn;

use super::{
    album_from_tag, first_picture, parse_opts, title_from_tag, track_from_tag, write_front_cover,
    CoverArt, TagAdapter,
};
use crate::artwork::NormalizedCover;
use crate::errors::{AppError, Result};

pub struct GenericAdapter;

fn probe_file(path: &Path) -> Option<TaggedFile> {
    match Probe::open(path)
        .map(|p| p.options(parse_opts()))
        .and_then(|p| p.read())
    {
        Ok(f) => Some(f),
        Err(e) => {
            warn!("failed to read tags from {}: {e}", path.display());
            None
        }
    }
}

fn best_tag(file: &TaggedFile) -> Option<&lofty::tag::Tag> {
    file.primary_tag().or_else(|| file.first_tag())
}

fn lower_ext(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

impl TagAdapter for GenericAdapter {
    fn read_cover(&self, path: &Path) -> Option<CoverArt> {
        first_picture(best_tag(&probe_file(path)?)?)
    }

    fn read_track_number(&self, path: &Path) -> Option<u32> {
        track_from_tag(best_tag(&probe_file(path)?)?)
    }

    fn read_title(&self, path: &Path) -> Option<String> {
        title_from_tag(best_tag(&probe_file(path)?)?)
    }

    fn read_album(&self, path: &Path) -> Option<String> {
        album_from_tag(best_tag(&probe_file(path)?)?)
    }

    fn embed_cover(&self, path: &Path, cover: &NormalizedCover, backup: bool) -> Result<()> {
        let tagged_file = Probe::open(path)
            .map(|p| p.options(parse_opts()))
            .and_then(|p| p.read())
            .map_err(|_| AppError::UnsupportedFormat(lower_ext(path)))?;

        if !tagged_file.file_type().supports_tag_type(TagType::Id3v2) {
            return Err(AppError::UnsupportedFormat(lower_ext(path)));
        }
        write_front_cover(path, TagType::Id3v2, cover, backup)
    }
}
