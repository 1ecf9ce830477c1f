//! FLAC adapter over Vorbis comments plus native PICTURE metadata blocks.
//!
//! The write path replaces every picture block with a single front cover;
//! block-level width/height/depth are derived from the JPEG payload at
//! serialization time.

use std::path::Path;

use lofty::tag::TagType;

use super::{
    album_from_tag, first_picture, read_native_tag, title_from_tag, track_from_tag,
    write_front_cover, CoverArt, TagAdapter,
};
use crate::artwork::NormalizedCover;
use crate::errors::Result;

pub struct FlacAdapter;

impl TagAdapter for FlacAdapter {
    fn read_cover(&self, path: &Path) -> Option<CoverArt> {
        first_picture(&read_native_tag(path, TagType::VorbisComments)?)
    }

    fn read_track_number(&self, path: &Path) -> Option<u32> {
        track_from_tag(&read_native_tag(path, TagType::VorbisComments)?)
    }

    fn read_title(&self, path: &Path) -> Option<String> {
        title_from_tag(&read_native_tag(path, TagType::VorbisComments)?)
    }

    fn read_album(&self, path: &Path) -> Option<String> {
        album_from_tag(&read_native_tag(path, TagType::VorbisComments)?)
    }

    fn embed_cover(&self, path: &Path, cover: &NormalizedCover, backup: bool) -> Result<()> {
        write_front_cover(path, TagType::VorbisComments, cover, backup)
    }
}
