use crate::naming::{map_base, TransformOptions};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

static TAG_RESOLUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(^|[\s_.-])(?:(?:2|4|8|16|32|64|128|256|512|1024|2048|4096|8192)[Kk]?|1[Kk])([\s_.-]|$)",
    )
    .expect("tag resolution pattern is valid")
});

static EXACT_RESOLUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_[0-9]{3,4}x[0-9]{3,4}").expect("exact resolution pattern is valid")
});

const RESOLUTION_TAGS: &[(u32, &str)] = &[
    (2, "2"),
    (4, "4"),
    (8, "8"),
    (16, "16"),
    (32, "32"),
    (64, "64"),
    (128, "128"),
    (256, "256"),
    (512, "512"),
    (1024, "1K"),
    (2048, "2K"),
    (4096, "4K"),
    (8192, "8K"),
];

/// Image facts reported by a [`MetadataProbe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Channel layout such as `RGB`, `RGBA` or `L`.
    pub kind: String,
    pub bit_depth: String,
}

/// Reads image facts for the resolution and image-info operations.
///
/// `None` means the file could not be probed; the operation is then skipped
/// and the name stays unchanged.
pub trait MetadataProbe: Send + Sync {
    fn resolution(&self, path: &Path) -> Option<(u32, u32)>;
    fn image_info(&self, path: &Path) -> Option<ImageInfo>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionStyle {
    /// `1024x512`
    Exact,
    /// `2K` for square power-of-two sizes, exact otherwise.
    Tag,
}

impl FromStr for ResolutionStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "tag" => Ok(Self::Tag),
            other => Err(format!("unknown resolution style: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfoField {
    Both,
    Kind,
    Bits,
}

impl FromStr for InfoField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "both" | "all" => Ok(Self::Both),
            "type" | "kind" => Ok(Self::Kind),
            "bits" | "depth" => Ok(Self::Bits),
            other => Err(format!("unknown image info field: {other}")),
        }
    }
}

pub fn resolution_tag(width: u32, height: u32) -> String {
    if width == height {
        if let Some((_, tag)) = RESOLUTION_TAGS.iter().find(|(size, _)| *size == width) {
            return (*tag).to_string();
        }
    }
    format!("{width}x{height}")
}

/// Appends `_{resolution}` before the extension.
pub fn add_resolution(
    name: &str,
    style: ResolutionStyle,
    resolution: Option<(u32, u32)>,
    options: &TransformOptions,
) -> String {
    let Some((width, height)) = resolution else {
        return name.to_string();
    };
    let suffix = match style {
        ResolutionStyle::Tag => resolution_tag(width, height),
        ResolutionStyle::Exact => format!("{width}x{height}"),
    };
    map_base(name, options, |base| format!("{base}_{suffix}"))
}

/// Appends `_{kind}_{bits}` (or one of them) before the extension.
pub fn add_image_info(
    name: &str,
    field: InfoField,
    info: Option<&ImageInfo>,
    options: &TransformOptions,
) -> String {
    let Some(info) = info else {
        return name.to_string();
    };
    let suffix = match field {
        InfoField::Both => format!("{}_{}", info.kind, info.bit_depth),
        InfoField::Kind => info.kind.clone(),
        InfoField::Bits => info.bit_depth.clone(),
    };
    if suffix.is_empty() {
        return name.to_string();
    }
    map_base(name, options, |base| format!("{base}_{suffix}"))
}

/// Strips resolution markers previously added by [`add_resolution`].
pub fn remove_resolution(name: &str, style: ResolutionStyle, options: &TransformOptions) -> String {
    map_base(name, options, |base| match style {
        ResolutionStyle::Exact => EXACT_RESOLUTION.replace_all(base, "").into_owned(),
        ResolutionStyle::Tag => {
            // The trailing delimiter is consumed by a match, so neighbouring
            // tags are only found on the next pass.
            let mut current = base.to_string();
            loop {
                let next = TAG_RESOLUTION.replace_all(&current, "${2}").into_owned();
                if next == current {
                    return current;
                }
                current = next;
            }
        }
    })
}
