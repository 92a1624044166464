use serde::{Deserialize, Serialize};

/// Flags that change how every transformation treats a filename.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOptions {
    /// Transform the whole name instead of the base name only.
    pub ignore_extension: bool,
    /// Keep all-uppercase words (acronyms) untouched in the case family.
    pub preserve_caps: bool,
}

/// Splits `name` on its last dot into `(base, extension)`.
///
/// The extension keeps its leading dot. Leading dots of dotfiles do not
/// count as an extension separator, so `".bashrc"` has no extension while
/// `"archive.tar.gz"` splits into `("archive.tar", ".gz")`.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if !name[..idx].chars().all(|c| c == '.') => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

/// Runs `f` on the part of `name` selected by `options`.
///
/// With `ignore_extension` unset only the base name is handed to `f` and the
/// original extension is reattached untouched.
pub fn map_base(name: &str, options: &TransformOptions, f: impl FnOnce(&str) -> String) -> String {
    if options.ignore_extension {
        return f(name);
    }
    let (base, ext) = split_extension(name);
    let mut out = f(base);
    out.push_str(ext);
    out
}

/// Why a computed name cannot be used as a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidName {
    Empty,
    DotEntry,
    Separator,
    Nul,
    TooLong,
}

impl InvalidName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty name",
            Self::DotEntry => "`.` and `..` are reserved",
            Self::Separator => "contains a path separator",
            Self::Nul => "contains a NUL character",
            Self::TooLong => "name too long",
        }
    }
}

/// Checks that `name` is usable as a single path component. `max_len` counts
/// characters; `0` disables the length check.
pub fn validate_name(name: &str, max_len: usize) -> Result<(), InvalidName> {
    if name.is_empty() {
        return Err(InvalidName::Empty);
    }
    if name == "." || name == ".." {
        return Err(InvalidName::DotEntry);
    }
    if name.contains(['/', '\\']) {
        return Err(InvalidName::Separator);
    }
    if name.contains('\0') {
        return Err(InvalidName::Nul);
    }
    if max_len > 0 && name.chars().count() > max_len {
        return Err(InvalidName::TooLong);
    }
    Ok(())
}

/// Extension of `name` without the dot, lowercased.
pub fn extension_of(name: &str) -> String {
    let (_, ext) = split_extension(name);
    ext.trim_start_matches('.').to_ascii_lowercase()
}
