//! Ogg/Opus adapter over Vorbis comments.
//!
//! Pictures live in the `METADATA_BLOCK_PICTURE` field as a base64-encoded
//! FLAC picture block. The normal read path goes through the parsed picture
//! list; when a file carries the field but the block did not parse, the raw
//! value is decoded here, with a magic-byte scan as the last resort for
//! blocks whose headers are mangled.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use lofty::tag::{ItemKey, ItemValue, Tag, TagType};

use super::{
    album_from_tag, first_picture, read_native_tag, title_from_tag, track_from_tag,
    write_front_cover, CoverArt, TagAdapter,
};
use crate::artwork::NormalizedCover;
use crate::errors::Result;

pub struct VorbisAdapter;

impl TagAdapter for VorbisAdapter {
    fn read_cover(&self, path: &Path) -> Option<CoverArt> {
        let tag = read_native_tag(path, TagType::VorbisComments)?;
        first_picture(&tag).or_else(|| cover_from_raw_field(&tag))
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
        // Serialized back out as a single base64 METADATA_BLOCK_PICTURE value.
        write_front_cover(path, TagType::VorbisComments, cover, backup)
    }
}

/// Recover a cover from a raw `METADATA_BLOCK_PICTURE` comment that survived
/// parsing as an unknown text item. The key is matched case-insensitively.
fn cover_from_raw_field(tag: &Tag) -> Option<CoverArt> {
    for item in tag.items() {
        let ItemKey::Unknown(key) = item.key() else {
            continue;
        };
        if !key.eq_ignore_ascii_case("metadata_block_picture") {
            continue;
        }
        let ItemValue::Text(encoded) = item.value() else {
            continue;
        };
        let raw = STANDARD.decode(encoded.trim()).ok()?;
        if let Some((data, mime_type)) = parse_picture_block(&raw) {
            return Some(CoverArt { data, mime_type });
        }
        return scan_for_image_magic(&raw);
    }
    None
}

/// Parse a binary FLAC picture block: big-endian picture type, MIME,
/// description, four dimension fields, then the image payload.
fn parse_picture_block(raw: &[u8]) -> Option<(Vec<u8>, String)> {
    let mut pos = 0usize;
    let _picture_type = read_u32(raw, &mut pos)?;

    let mime_len = read_u32(raw, &mut pos)? as usize;
    let mime = std::str::from_utf8(take(raw, &mut pos, mime_len)?)
        .ok()?
        .to_string();

    let description_len = read_u32(raw, &mut pos)? as usize;
    take(raw, &mut pos, description_len)?;

    // width, height, depth, palette size
    for _ in 0..4 {
        read_u32(raw, &mut pos)?;
    }

    let data_len = read_u32(raw, &mut pos)? as usize;
    let data = take(raw, &mut pos, data_len)?.to_vec();
    Some((data, mime))
}

fn read_u32(raw: &[u8], pos: &mut usize) -> Option<u32> {
    let bytes = take(raw, pos, 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn take<'a>(raw: &'a [u8], pos: &mut usize, len: usize) -> Option<&'a [u8]> {
    let end = pos.checked_add(len)?;
    let slice = raw.get(*pos..end)?;
    *pos = end;
    Some(slice)
}

/// Last-resort recovery: find a JPEG or PNG signature anywhere in the decoded
/// bytes and return everything from that offset.
fn scan_for_image_magic(raw: &[u8]) -> Option<CoverArt> {
    if let Some(start) = find(raw, &[0xFF, 0xD8, 0xFF]) {
        return Some(CoverArt {
            data: raw[start..].to_vec(),
            mime_type: "image/jpeg".to_string(),
        });
    }
    if let Some(start) = find(raw, b"\x89PNG") {
        return Some(CoverArt {
            data: raw[start..].to_vec(),
            mime_type: "image/png".to_string(),
        });
    }
    None
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picture_block(mime: &str, description: &str, data: &[u8]) -> Vec<u8> {
        let mut block = Vec::new();
        block.extend_from_slice(&3u32.to_be_bytes()); // front cover
        block.extend_from_slice(&(mime.len() as u32).to_be_bytes());
        block.extend_from_slice(mime.as_bytes());
        block.extend_from_slice(&(description.len() as u32).to_be_bytes());
        block.extend_from_slice(description.as_bytes());
        for dim in [600u32, 450, 24, 0] {
            block.extend_from_slice(&dim.to_be_bytes());
        }
        block.extend_from_slice(&(data.len() as u32).to_be_bytes());
        block.extend_from_slice(data);
        block
    }

    #[test]
    fn parses_well_formed_picture_block() {
        let payload = [0xFFu8, 0xD8, 0xFF, 0xE0, 1, 2, 3];
        let block = picture_block("image/jpeg", "", &payload);
        let (data, mime) = parse_picture_block(&block).expect("parse");
        assert_eq!(mime, "image/jpeg");
        assert_eq!(data, payload);
    }

    #[test]
    fn truncated_block_fails_parsing() {
        let payload = [0xFFu8, 0xD8, 0xFF, 0xE0];
        let mut block = picture_block("image/jpeg", "desc", &payload);
        block.truncate(block.len() - 2);
        assert!(parse_picture_block(&block).is_none());
    }

    #[test]
    fn magic_scan_recovers_jpeg_suffix() {
        let mut raw = vec![0u8; 16];
        raw.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0, 9, 9]);
        let cover = scan_for_image_magic(&raw).expect("scan");
        assert_eq!(cover.mime_type, "image/jpeg");
        assert_eq!(cover.data, &[0xFF, 0xD8, 0xFF, 0xE0, 9, 9]);
    }

    #[test]
    fn magic_scan_recovers_png_suffix() {
        let mut raw = vec![1u8, 2, 3];
        raw.extend_from_slice(b"\x89PNG\r\n");
        let cover = scan_for_image_magic(&raw).expect("scan");
        assert_eq!(cover.mime_type, "image/png");
    }

    #[test]
    fn magic_scan_gives_up_without_signatures() {
        assert!(scan_for_image_magic(&[0u8; 64]).is_none());
    }
}
