//! MP3 adapter over the ID3v2 frame set (APIC / TRCK / TIT2 / TALB).

use std::path::Path;

use lofty::tag::TagType;

use super::{
    album_from_tag, first_picture, read_native_tag, title_from_tag, track_from_tag,
    write_front_cover, CoverArt, TagAdapter,
};
use crate::artwork::NormalizedCover;
use crate::errors::Result;

pub struct Id3Adapter;

impl TagAdapter for Id3Adapter {
    fn read_cover(&self, path: &Path) -> Option<CoverArt> {
        first_picture(&read_native_tag(path, TagType::Id3v2)?)
    }

    fn read_track_number(&self, path: &Path) -> Option<u32> {
        track_from_tag(&read_native_tag(path, TagType::Id3v2)?)
    }

    fn read_title(&self, path: &Path) -> Option<String> {
        title_from_tag(&read_native_tag(path, TagType::Id3v2)?)
    }

    fn read_album(&self, path: &Path) -> Option<String> {
        album_from_tag(&read_native_tag(path, TagType::Id3v2)?)
    }

    fn embed_cover(&self, path: &Path, cover: &NormalizedCover, backup: bool) -> Result<()> {
        write_front_cover(path, TagType::Id3v2, cover, backup)
    }
}
