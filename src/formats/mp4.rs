//! MP4/M4A adapter over ilst atoms (covr / trkn / ©nam / ©alb).
//!
//! Cover atoms declare their format as a fourcc rather than a MIME type, so
//! the MIME is sniffed from the image's magic bytes instead.

use std::path::Path;

use lofty::tag::TagType;

use super::{
    album_from_tag, read_native_tag, sniff_image_mime, title_from_tag, track_from_tag,
    write_front_cover, CoverArt, TagAdapter,
};
use crate::artwork::NormalizedCover;
use crate::errors::Result;

pub struct Mp4Adapter;

impl TagAdapter for Mp4Adapter {
    fn read_cover(&self, path: &Path) -> Option<CoverArt> {
        let tag = read_native_tag(path, TagType::Mp4Ilst)?;
        let picture = tag.pictures().first()?;
        Some(CoverArt {
            data: picture.data().to_vec(),
            mime_type: sniff_image_mime(picture.data()).to_string(),
        })
    }

    fn read_track_number(&self, path: &Path) -> Option<u32> {
        // trkn is a binary pair atom; the accessor yields its first element.
        track_from_tag(&read_native_tag(path, TagType::Mp4Ilst)?)
    }

    fn read_title(&self, path: &Path) -> Option<String> {
        title_from_tag(&read_native_tag(path, TagType::Mp4Ilst)?)
    }

    fn read_album(&self, path: &Path) -> Option<String> {
        album_from_tag(&read_native_tag(path, TagType::Mp4Ilst)?)
    }

    fn embed_cover(&self, path: &Path, cover: &NormalizedCover, backup: bool) -> Result<()> {
        write_front_cover(path, TagType::Mp4Ilst, cover, backup)
    }
}
