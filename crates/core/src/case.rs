use crate::naming::{map_base, TransformOptions};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseStyle {
    Upper,
    Lower,
    Snake,
    Camel,
    Pascal,
    Kebab,
    Title,
    Space, // lowercase words joined by single spaces
}

impl CaseStyle {
    pub const ALL: [CaseStyle; 8] = [
        Self::Upper,
        Self::Lower,
        Self::Snake,
        Self::Camel,
        Self::Pascal,
        Self::Kebab,
        Self::Title,
        Self::Space,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upper => "upper",
            Self::Lower => "lower",
            Self::Snake => "snake",
            Self::Camel => "camel",
            Self::Pascal => "pascal",
            Self::Kebab => "kebab",
            Self::Title => "title",
            Self::Space => "space",
        }
    }
}

impl FromStr for CaseStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        let wanted = wanted
            .strip_suffix("_case")
            .or_else(|| wanted.strip_suffix("case"))
            .unwrap_or(&wanted);
        Self::ALL
            .into_iter()
            .find(|style| style.as_str() == wanted)
            .ok_or_else(|| format!("unknown case style: {s}"))
    }
}

/// Converts the name (or its base) to `style`.
pub fn convert_case(name: &str, style: CaseStyle, options: &TransformOptions) -> String {
    map_base(name, options, |base| convert_str(base, style, options.preserve_caps))
}

/// Swaps the case of every cased character.
pub fn flip_case(name: &str, options: &TransformOptions) -> String {
    map_base(name, options, |base| {
        let mut out = String::with_capacity(base.len());
        for ch in base.chars() {
            if ch.is_uppercase() {
                out.extend(ch.to_lowercase());
            } else if ch.is_lowercase() {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
        }
        out
    })
}

fn convert_str(input: &str, style: CaseStyle, preserve_caps: bool) -> String {
    match style {
        CaseStyle::Upper => input.to_uppercase(),
        CaseStyle::Lower => input.to_lowercase(),
        CaseStyle::Snake => split_words(input, preserve_caps).join("_"),
        CaseStyle::Kebab => split_words(input, preserve_caps).join("-"),
        CaseStyle::Space => split_words(input, preserve_caps).join(" "),
        CaseStyle::Title => split_words(input, preserve_caps)
            .iter()
            .map(|w| capitalize(w))
            .collect::<Vec<_>>()
            .join(" "),
        CaseStyle::Pascal => split_words(input, preserve_caps)
            .iter()
            .map(|w| capitalize(w))
            .collect(),
        CaseStyle::Camel => split_words(input, preserve_caps)
            .iter()
            .enumerate()
            .map(|(i, w)| if i == 0 { w.clone() } else { capitalize(w) })
            .collect(),
    }
}

/// Splits an identifier-ish string into words.
///
/// `_` and `-` become spaces, a boundary is inserted wherever a lowercase
/// letter is followed by an uppercase one, and the result is split on
/// whitespace. Every word is lowercased unless `preserve_caps` is set and the
/// word is entirely uppercase.
pub fn split_words(input: &str, preserve_caps: bool) -> Vec<String> {
    let mut spaced = String::with_capacity(input.len() + 8);
    let mut prev: Option<char> = None;
    for ch in input.chars() {
        let ch = if ch == '_' || ch == '-' { ' ' } else { ch };
        if let Some(p) = prev {
            if p.is_lowercase() && ch.is_uppercase() {
                spaced.push(' ');
            }
        }
        spaced.push(ch);
        prev = Some(ch);
    }

    spaced
        .split_whitespace()
        .map(|word| {
            if preserve_caps && is_acronym(word) {
                word.to_string()
            } else {
                word.to_lowercase()
            }
        })
        .collect()
}

fn is_acronym(word: &str) -> bool {
    word.chars().any(char::is_uppercase) && !word.chars().any(char::is_lowercase)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::split_extension;
    use proptest::prelude::*;

    fn opts() -> TransformOptions {
        TransformOptions::default()
    }

    #[test]
    fn word_splitting_handles_separators_and_humps() {
        assert_eq!(
            split_words("myFile_name-v2 final", false),
            vec!["my", "file", "name", "v2", "final"]
        );
        assert_eq!(split_words("HTTPServer", false), vec!["httpserver"]);
        assert_eq!(split_words("", false), Vec::<String>::new());
    }

    #[test]
    fn preserve_caps_keeps_acronyms() {
        assert_eq!(
            split_words("NASA_launch_HD", true),
            vec!["NASA", "launch", "HD"]
        );
        let keep = TransformOptions {
            preserve_caps: true,
            ..opts()
        };
        assert_eq!(
            convert_case("NASA launch.png", CaseStyle::Pascal, &keep),
            "NASALaunch.png"
        );
    }

    #[test]
    fn every_style_on_base_name() {
        let name = "IMG_Holiday photo.JPG";
        let cases = [
            (CaseStyle::Upper, "IMG_HOLIDAY PHOTO.JPG"),
            (CaseStyle::Lower, "img_holiday photo.JPG"),
            (CaseStyle::Snake, "img_holiday_photo.JPG"),
            (CaseStyle::Kebab, "img-holiday-photo.JPG"),
            (CaseStyle::Camel, "imgHolidayPhoto.JPG"),
            (CaseStyle::Pascal, "ImgHolidayPhoto.JPG"),
            (CaseStyle::Title, "Img Holiday Photo.JPG"),
            (CaseStyle::Space, "img holiday photo.JPG"),
        ];
        for (style, expected) in cases {
            assert_eq!(convert_case(name, style, &opts()), expected, "{style:?}");
        }
    }

    #[test]
    fn ignore_extension_converts_whole_name() {
        let whole = TransformOptions {
            ignore_extension: true,
            ..opts()
        };
        assert_eq!(convert_case("report.PDF", CaseStyle::Lower, &whole), "report.pdf");
    }

    #[test]
    fn flip_swaps_case() {
        assert_eq!(flip_case("AbC-d.TXT", &opts()), "aBc-D.TXT");
    }

    #[test]
    fn parse_style_names() {
        assert_eq!("snake".parse::<CaseStyle>(), Ok(CaseStyle::Snake));
        assert_eq!("Snake_Case".parse::<CaseStyle>(), Ok(CaseStyle::Snake));
        assert_eq!("TITLE".parse::<CaseStyle>(), Ok(CaseStyle::Title));
        assert!("shouting".parse::<CaseStyle>().is_err());
    }

    proptest! {
        #[test]
        fn snake_case_is_idempotent(name in "[a-zA-Z][a-zA-Z0-9_ -]{0,16}(\\.[a-zA-Z0-9]{1,4})?") {
            let once = convert_case(&name, CaseStyle::Snake, &opts());
            let twice = convert_case(&once, CaseStyle::Snake, &opts());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn case_family_keeps_extension(
            base in "[a-zA-Z][a-zA-Z0-9_ -]{0,16}",
            ext in "\\.[a-zA-Z0-9]{1,4}",
        ) {
            for style in CaseStyle::ALL {
                let name = format!("{base}{ext}");
                let converted = convert_case(&name, style, &opts());
                let expected_base = convert_str(&base, style, false);
                prop_assert_eq!(split_extension(&converted), (expected_base.as_str(), ext.as_str()));
            }
        }
    }
}
