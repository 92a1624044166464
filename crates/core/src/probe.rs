use crate::image_info::{ImageInfo, MetadataProbe};
use anyhow::{bail, Context, Result};
use exif::{In, Reader, Tag};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Probe backed by the PNG header and EXIF fields of the file.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifProbe;

/// Probe that never succeeds. Used when image facts are not wanted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProbe;

impl MetadataProbe for NoProbe {
    fn resolution(&self, _path: &Path) -> Option<(u32, u32)> {
        None
    }

    fn image_info(&self, _path: &Path) -> Option<ImageInfo> {
        None
    }
}

impl MetadataProbe for ExifProbe {
    fn resolution(&self, path: &Path) -> Option<(u32, u32)> {
        match probe_facts(path) {
            Ok(facts) => Some((facts.width?, facts.height?)),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "resolution probe failed");
                None
            }
        }
    }

    fn image_info(&self, path: &Path) -> Option<ImageInfo> {
        match probe_facts(path) {
            Ok(facts) => Some(ImageInfo {
                kind: facts.kind?,
                bit_depth: facts.bit_depth?.to_string(),
            }),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "image info probe failed");
                None
            }
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ImageFacts {
    width: Option<u32>,
    height: Option<u32>,
    kind: Option<String>,
    bit_depth: Option<u32>,
}

fn probe_facts(path: &Path) -> Result<ImageFacts> {
    let file = File::open(path)
        .with_context(|| format!("failed to open image: {}", path.display()))?;
    let mut buf = BufReader::new(file);

    let mut head = [0u8; 26];
    let read = buf
        .read(&mut head)
        .with_context(|| format!("failed to read image header: {}", path.display()))?;
    if read == head.len() && head[..8] == PNG_SIGNATURE {
        return parse_png_header(&head);
    }

    read_exif_facts(path)
}

/// Width, height and pixel layout from the IHDR chunk.
fn parse_png_header(head: &[u8; 26]) -> Result<ImageFacts> {
    if &head[12..16] != b"IHDR" {
        bail!("PNG does not start with an IHDR chunk");
    }
    let width = u32::from_be_bytes([head[16], head[17], head[18], head[19]]);
    let height = u32::from_be_bytes([head[20], head[21], head[22], head[23]]);
    let kind = match head[25] {
        0 => "L",
        2 => "RGB",
        3 => "P",
        4 => "LA",
        6 => "RGBA",
        other => bail!("unknown PNG color type {other}"),
    };
    Ok(ImageFacts {
        width: Some(width),
        height: Some(height),
        kind: Some(kind.to_string()),
        bit_depth: Some(u32::from(head[24])),
    })
}

fn read_exif_facts(path: &Path) -> Result<ImageFacts> {
    let file = File::open(path)
        .with_context(|| format!("failed to open image: {}", path.display()))?;
    let mut buf = BufReader::new(file);
    let exif = Reader::new()
        .read_from_container(&mut buf)
        .with_context(|| format!("failed to parse EXIF: {}", path.display()))?;

    let uint = |tags: &[Tag]| {
        tags.iter().find_map(|tag| {
            exif.get_field(*tag, In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
    };

    let samples = uint(&[Tag::SamplesPerPixel]);
    let kind = match samples {
        Some(1) => Some("L".to_string()),
        Some(2) => Some("LA".to_string()),
        Some(3) => Some("RGB".to_string()),
        Some(4) => Some("RGBA".to_string()),
        Some(_) => None,
        // JPEG files rarely carry SamplesPerPixel; baseline JPEG is 8-bit RGB.
        None if is_jpeg(path) => Some("RGB".to_string()),
        None => None,
    };
    let bit_depth = uint(&[Tag::BitsPerSample]).or_else(|| is_jpeg(path).then_some(8));

    Ok(ImageFacts {
        width: uint(&[Tag::PixelXDimension, Tag::ImageWidth]),
        height: uint(&[Tag::PixelYDimension, Tag::ImageLength]),
        kind,
        bit_depth,
    })
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}
