use crate::naming::{map_base, split_extension, TransformOptions};
use chrono::{DateTime, Local, NaiveDate};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::LazyLock;

const MAX_DATE_PASSES: usize = 4;

static DMY_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^0-9])([0-9]{2})[-._]([0-9]{2})[-._]([0-9]{4})([^0-9]|$)")
        .expect("date pattern is valid")
});

/// Literal replace. Matching ignores ASCII case so that a replace step still
/// finds its text after an earlier case conversion.
pub fn replace_literal(name: &str, old: &str, new: &str, options: &TransformOptions) -> String {
    if old.is_empty() {
        return name.to_string();
    }
    map_base(name, options, |base| replace_case_insensitive(base, old, new))
}

/// Pattern replace; `$1`/`${name}` in `replacement` expand capture groups.
pub fn replace_pattern(
    name: &str,
    pattern: &Regex,
    replacement: &str,
    options: &TransformOptions,
) -> String {
    map_base(name, options, |base| {
        pattern.replace_all(base, replacement).into_owned()
    })
}

/// Replaces the `index`-th `separator`-delimited token with `new_text`.
pub fn replace_word_by_index(
    name: &str,
    separator: &str,
    index: usize,
    new_text: &str,
    options: &TransformOptions,
) -> String {
    if separator.is_empty() {
        return name.to_string();
    }
    map_base(name, options, |base| {
        let mut words: Vec<&str> = base.split(separator).collect();
        match words.get_mut(index) {
            Some(word) => {
                *word = new_text;
                words.join(separator)
            }
            None => base.to_string(),
        }
    })
}

/// Swaps the extension when it equals `old`. Works on the real extension
/// whatever `ignore_extension` says.
pub fn replace_extension(name: &str, old: &str, new: &str) -> String {
    let (base, ext) = split_extension(name);
    let old = old.trim_start_matches('.');
    if ext.is_empty() || !ext[1..].eq_ignore_ascii_case(old) {
        return name.to_string();
    }
    let new = new.trim_start_matches('.');
    if new.is_empty() {
        base.to_string()
    } else {
        format!("{base}.{new}")
    }
}

pub fn remove_numbers(name: &str, options: &TransformOptions) -> String {
    map_base(name, options, |base| {
        base.chars().filter(|c| !c.is_ascii_digit()).collect()
    })
}

/// Keeps only `[A-Za-z0-9._]`.
pub fn remove_special(name: &str, options: &TransformOptions) -> String {
    map_base(name, options, |base| {
        base.chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_')
            .collect()
    })
}

pub fn remove_non_ascii(name: &str, options: &TransformOptions) -> String {
    map_base(name, options, |base| base.chars().filter(|c| (*c as u32) < 128).collect())
}

/// Strips every leading repetition of `run`.
pub fn remove_leading(name: &str, run: &str, options: &TransformOptions) -> String {
    if run.is_empty() {
        return name.to_string();
    }
    map_base(name, options, |base| {
        let mut rest = base;
        while let Some(stripped) = rest.strip_prefix(run) {
            rest = stripped;
        }
        rest.to_string()
    })
}

/// Strips every trailing repetition of `run`.
pub fn remove_trailing(name: &str, run: &str, options: &TransformOptions) -> String {
    if run.is_empty() {
        return name.to_string();
    }
    map_base(name, options, |base| {
        let mut rest = base;
        while let Some(stripped) = rest.strip_suffix(run) {
            rest = stripped;
        }
        rest.to_string()
    })
}

/// Collapses `(word)(word)` repeats inside tokens, then drops repeated whole
/// words split on `_`/whitespace. Words are rejoined with `_`.
pub fn remove_duplicates(name: &str, options: &TransformOptions) -> String {
    map_base(name, options, |base| {
        let collapsed = collapse_adjacent_repeats(base);
        let mut seen = HashSet::new();
        split_on_underscore_or_space(&collapsed)
            .into_iter()
            .filter(|word| seen.insert(*word))
            .collect::<Vec<_>>()
            .join("_")
    })
}

/// Removes every occurrence of `text` except the `keep_index`-th one.
///
/// Fewer than two occurrences leaves the name alone. An out-of-range index
/// keeps the last occurrence.
pub fn remove_repeating(
    name: &str,
    text: &str,
    keep_index: usize,
    options: &TransformOptions,
) -> String {
    if text.is_empty() {
        return name.to_string();
    }
    map_base(name, options, |part| {
        let starts: Vec<usize> = part.match_indices(text).map(|(at, _)| at).collect();
        if starts.len() <= 1 {
            return part.to_string();
        }
        let kept = starts[keep_index.min(starts.len() - 1)];

        let mut out = String::with_capacity(part.len());
        let mut cursor = 0usize;
        for start in starts {
            if start == kept {
                continue;
            }
            out.push_str(&part[cursor..start]);
            cursor = start + text.len();
        }
        out.push_str(&part[cursor..]);
        out
    })
}

/// Collapses consecutive repeats of `text` into one.
pub fn remove_repeating_connected(name: &str, text: &str, options: &TransformOptions) -> String {
    if text.is_empty() {
        return name.to_string();
    }
    map_base(name, options, |part| {
        let mut out = String::with_capacity(part.len());
        let mut rest = part;
        while let Some(ch) = rest.chars().next() {
            if let Some(mut after) = rest.strip_prefix(text) {
                out.push_str(text);
                while let Some(next) = after.strip_prefix(text) {
                    after = next;
                }
                rest = after;
            } else {
                out.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
        out
    })
}

/// Prepends `text` to the whole name.
pub fn add_prefix(name: &str, text: &str) -> String {
    format!("{text}{name}")
}

/// Appends `text` before the extension.
pub fn add_suffix(name: &str, text: &str, options: &TransformOptions) -> String {
    map_base(name, options, |base| format!("{base}{text}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertAnchor {
    Start,
    End,
}

impl FromStr for InsertAnchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" | "left" | "front" => Ok(Self::Start),
            "end" | "right" | "back" => Ok(Self::End),
            other => Err(format!("unknown insert anchor: {other}")),
        }
    }
}

/// Inserts `text` at character `index`, counted from the start or the end.
pub fn insert_text(
    name: &str,
    text: &str,
    index: usize,
    anchor: InsertAnchor,
    options: &TransformOptions,
) -> String {
    map_base(name, options, |base| {
        let len = base.chars().count();
        if index > len {
            return base.to_string();
        }
        let at = match anchor {
            InsertAnchor::Start => index,
            InsertAnchor::End => len - index,
        };
        let byte_at = base.char_indices().nth(at).map_or(base.len(), |(i, _)| i);
        format!("{}{}{}", &base[..byte_at], text, &base[byte_at..])
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampGranularity {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl TimestampGranularity {
    fn format(self) -> &'static str {
        match self {
            Self::Year => "%Y",
            Self::Month => "%Y-%m",
            Self::Day => "%Y-%m-%d",
            Self::Hour => "%Y-%m-%d_%H",
            Self::Minute => "%Y-%m-%d_%H-%M",
            Self::Second => "%Y-%m-%d_%H-%M-%S",
        }
    }
}

impl FromStr for TimestampGranularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "year" => Ok(Self::Year),
            "month" => Ok(Self::Month),
            "day" => Ok(Self::Day),
            "hour" => Ok(Self::Hour),
            "minute" => Ok(Self::Minute),
            "second" | "full" => Ok(Self::Second),
            other => Err(format!("unknown timestamp granularity: {other}")),
        }
    }
}

/// Appends `_{timestamp}` before the extension.
pub fn add_timestamp(
    name: &str,
    granularity: TimestampGranularity,
    at: DateTime<Local>,
    options: &TransformOptions,
) -> String {
    let stamp = at.format(granularity.format()).to_string();
    add_suffix(name, &format!("_{stamp}"), options)
}

pub fn reverse(name: &str, options: &TransformOptions) -> String {
    map_base(name, options, |base| base.chars().rev().collect())
}

pub fn trim(name: &str, options: &TransformOptions) -> String {
    map_base(name, options, |base| base.trim().to_string())
}

pub fn replace_spaces(name: &str, options: &TransformOptions) -> String {
    map_base(name, options, |base| base.replace(' ', "_"))
}

/// Collapses runs of the same separator and trims separators and dots from
/// both ends.
pub fn clean(name: &str, options: &TransformOptions) -> String {
    map_base(name, options, cleanup_separators)
}

/// Shortens the name to at most `limit` characters including the extension.
/// Whole `_` tokens are dropped from the end first.
pub fn truncate(name: &str, limit: usize, options: &TransformOptions) -> String {
    if limit == 0 {
        return name.to_string();
    }
    if options.ignore_extension {
        return truncate_base(name, "", limit);
    }
    let (base, ext) = split_extension(name);
    format!("{}{}", truncate_base(base, ext, limit), ext)
}

/// Rewrites `DD-MM-YYYY` style dates to `YYYY-MM-DD`. Impossible dates are
/// left alone.
pub fn standardize_dates(name: &str, options: &TransformOptions) -> String {
    map_base(name, options, |base| {
        // A match consumes the delimiter after it, so adjacent dates need
        // another pass.
        let mut current = base.to_string();
        for _ in 0..MAX_DATE_PASSES {
            let next = DMY_DATE
                .replace_all(&current, |caps: &Captures| rewrite_date(caps))
                .into_owned();
            if next == current {
                break;
            }
            current = next;
        }
        current
    })
}

/// Drops leading zeros from every digit run, keeping at least one digit.
pub fn remove_zeros(name: &str, options: &TransformOptions) -> String {
    map_base(name, options, |base| {
        map_digit_runs(base, |run| {
            let trimmed = run.trim_start_matches('0');
            if trimmed.is_empty() {
                "0".to_string()
            } else {
                trimmed.to_string()
            }
        })
    })
}

/// Left-pads every digit run with zeros to `width` digits.
pub fn add_zeros(name: &str, width: usize, options: &TransformOptions) -> String {
    map_base(name, options, |base| {
        map_digit_runs(base, |run| {
            let mut padded = "0".repeat(width.saturating_sub(run.len()));
            padded.push_str(run);
            padded
        })
    })
}

fn rewrite_date(caps: &Captures) -> String {
    let whole = caps[0].to_string();
    let (Ok(day), Ok(month), Ok(year)) = (
        caps[2].parse::<u32>(),
        caps[3].parse::<u32>(),
        caps[4].parse::<i32>(),
    ) else {
        return whole;
    };
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => format!("{}{}{}", &caps[1], date.format("%Y-%m-%d"), &caps[5]),
        None => whole,
    }
}

fn map_digit_runs(input: &str, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(input.len());
    let mut run_start: Option<usize> = None;
    for (i, ch) in input.char_indices() {
        match (ch.is_ascii_digit(), run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                out.push_str(&f(&input[start..i]));
                run_start = None;
                out.push(ch);
            }
            (false, None) => out.push(ch),
            (true, Some(_)) => {}
        }
    }
    if let Some(start) = run_start {
        out.push_str(&f(&input[start..]));
    }
    out
}

fn replace_case_insensitive(haystack: &str, needle: &str, replacement: &str) -> String {
    let lower_hay = haystack.to_ascii_lowercase();
    let lower_needle = needle.to_ascii_lowercase();

    let mut result = String::with_capacity(haystack.len());
    let mut cursor = 0usize;

    while let Some(pos) = lower_hay[cursor..].find(&lower_needle) {
        let abs_pos = cursor + pos;
        result.push_str(&haystack[cursor..abs_pos]);
        result.push_str(replacement);
        cursor = abs_pos + lower_needle.len();
    }

    result.push_str(&haystack[cursor..]);
    result
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Leftmost-longest removal of `XX` where `X` is a run of word characters.
fn collapse_adjacent_repeats(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0usize;

    while i < chars.len() {
        let run = chars[i..].iter().take_while(|c| is_word_char(**c)).count();
        let repeat = (1..=run)
            .rev()
            .find(|&len| i + 2 * len <= chars.len() && chars[i..i + len] == chars[i + len..i + 2 * len]);
        match repeat {
            Some(len) => {
                out.extend(&chars[i..i + len]);
                i += 2 * len;
            }
            None => {
                out.push(chars[i]);
                i += 1;
            }
        }
    }
    out
}

fn split_on_underscore_or_space(text: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut start = 0usize;
    let mut in_separator = false;
    for (i, ch) in text.char_indices() {
        let is_sep = ch == '_' || ch.is_whitespace();
        if is_sep && !in_separator {
            words.push(&text[start..i]);
            in_separator = true;
        }
        if !is_sep && in_separator {
            start = i;
            in_separator = false;
        }
    }
    words.push(if in_separator { "" } else { &text[start..] });
    words
}

fn cleanup_separators(value: &str) -> String {
    let mut out = String::new();
    let mut prev_sep: Option<char> = None;

    for ch in value.chars() {
        if is_collapse_separator(ch) {
            if prev_sep == Some(ch) {
                continue;
            }
            prev_sep = Some(ch);
            out.push(ch);
        } else {
            prev_sep = None;
            out.push(ch);
        }
    }

    out.trim_matches(|c: char| c == '_' || c == '-' || c == ' ' || c == '.')
        .to_string()
}

fn is_collapse_separator(ch: char) -> bool {
    matches!(ch, '_' | '-' | ' ')
}

fn truncate_base(base: &str, extension_with_dot: &str, limit: usize) -> String {
    let ext_len = extension_with_dot.chars().count();
    if base.chars().count() + ext_len <= limit {
        return base.to_string();
    }

    let mut tokens: Vec<&str> = base.split('_').collect();
    while tokens.len() > 1 {
        tokens.pop();
        let candidate = tokens.join("_");
        if candidate.chars().count() + ext_len <= limit {
            return candidate;
        }
    }

    base.chars().take(limit.saturating_sub(ext_len)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn opts() -> TransformOptions {
        TransformOptions::default()
    }

    fn whole() -> TransformOptions {
        TransformOptions {
            ignore_extension: true,
            ..TransformOptions::default()
        }
    }

    #[test]
    fn literal_replace_ignores_ascii_case() {
        assert_eq!(
            replace_literal("img_holiday.JPG", "IMG", "photo", &opts()),
            "photo_holiday.JPG"
        );
        assert_eq!(replace_literal("a.txt", "", "x", &opts()), "a.txt");
        assert_eq!(replace_literal("a.txt", "txt", "md", &opts()), "a.txt");
        assert_eq!(replace_literal("a.txt", "txt", "md", &whole()), "a.md");
    }

    #[test]
    fn pattern_replace_expands_groups() {
        let re = Regex::new(r"(\d+)-(\d+)").expect("regex");
        assert_eq!(
            replace_pattern("shot 10-20.png", &re, "$2-$1", &opts()),
            "shot 20-10.png"
        );
    }

    #[test]
    fn word_index_out_of_range_is_noop() {
        assert_eq!(
            replace_word_by_index("a_b_c.txt", "_", 1, "X", &opts()),
            "a_X_c.txt"
        );
        assert_eq!(
            replace_word_by_index("a_b_c.txt", "_", 3, "X", &opts()),
            "a_b_c.txt"
        );
        assert_eq!(replace_word_by_index("", "_", 5, "X", &opts()), "");
        assert_eq!(replace_word_by_index("a_b", "", 0, "X", &opts()), "a_b");
    }

    #[test]
    fn extension_replace_matches_case_insensitively() {
        assert_eq!(replace_extension("notes.TXT", ".txt", ".md"), "notes.md");
        assert_eq!(replace_extension("notes.txt", "png", "jpg"), "notes.txt");
        assert_eq!(replace_extension("notes", "txt", "md"), "notes");
    }

    #[test]
    fn structural_removals() {
        assert_eq!(remove_numbers("take2_v10.mp4", &opts()), "take_v.mp4");
        assert_eq!(remove_special("hé llo-world!.txt", &opts()), "hlloworld.txt");
        assert_eq!(remove_non_ascii("café_ß.txt", &opts()), "caf_.txt");
        assert_eq!(remove_leading("___a_b.txt", "_", &opts()), "a_b.txt");
        assert_eq!(remove_trailing("a_b---.txt", "-", &opts()), "a_b.txt");
        assert_eq!(remove_leading("xyxya.txt", "xy", &opts()), "a.txt");
        assert_eq!(remove_leading("a.txt", "", &opts()), "a.txt");
    }

    #[test]
    fn duplicates_collapse_patterns_and_words() {
        assert_eq!(remove_duplicates("testtest.txt", &opts()), "test.txt");
        assert_eq!(remove_duplicates("test test test.txt", &opts()), "test.txt");
        assert_eq!(remove_duplicates("a_b_a_c.txt", &opts()), "a_b_c.txt");
        assert_eq!(remove_duplicates("", &opts()), "");
    }

    #[test]
    fn remove_repeating_keeps_selected_occurrence() {
        assert_eq!(remove_repeating("a_b_a_c_a", "a", 1, &opts()), "_b_a_c_");
        assert_eq!(remove_repeating("a_b_a_c_a", "a", 0, &opts()), "a_b__c_");
        assert_eq!(remove_repeating("a_b_a_c_a", "a", 9, &opts()), "_b__c_a");
        assert_eq!(remove_repeating("a_b.txt", "a", 0, &opts()), "a_b.txt");
        assert_eq!(remove_repeating("x.a.a", "a", 0, &opts()), "x.a.a");
    }

    #[test]
    fn repeating_runs_collapse() {
        assert_eq!(
            remove_repeating_connected("a___b__c.txt", "_", &opts()),
            "a_b_c.txt"
        );
        assert_eq!(
            remove_repeating_connected("abababx.txt", "ab", &opts()),
            "abx.txt"
        );
    }

    #[test]
    fn insertions() {
        assert_eq!(add_prefix("a.txt", "pre_"), "pre_a.txt");
        assert_eq!(add_suffix("a.txt", "_suf", &opts()), "a_suf.txt");
        assert_eq!(add_suffix("a.txt", "_suf", &whole()), "a.txt_suf");
        assert_eq!(
            insert_text("abcd.txt", "-", 2, InsertAnchor::Start, &opts()),
            "ab-cd.txt"
        );
        assert_eq!(
            insert_text("abcd.txt", "-", 1, InsertAnchor::End, &opts()),
            "abc-d.txt"
        );
        assert_eq!(
            insert_text("abcd.txt", "-", 9, InsertAnchor::Start, &opts()),
            "abcd.txt"
        );
    }

    #[test]
    fn timestamp_granularities() {
        let at = Local
            .with_ymd_and_hms(2024, 5, 17, 14, 3, 59)
            .single()
            .expect("valid local time");
        assert_eq!(
            add_timestamp("a.txt", TimestampGranularity::Year, at, &opts()),
            "a_2024.txt"
        );
        assert_eq!(
            add_timestamp("a.txt", TimestampGranularity::Day, at, &opts()),
            "a_2024-05-17.txt"
        );
        assert_eq!(
            add_timestamp("a.txt", TimestampGranularity::Second, at, &opts()),
            "a_2024-05-17_14-03-59.txt"
        );
    }

    #[test]
    fn whole_string_ops() {
        assert_eq!(reverse("abc.txt", &opts()), "cba.txt");
        assert_eq!(reverse("abc.txt", &whole()), "txt.cba");
        assert_eq!(trim("  a b  .txt", &opts()), "a b.txt");
        assert_eq!(replace_spaces("a b c.txt", &opts()), "a_b_c.txt");
        assert_eq!(clean("__hello___world__.txt", &opts()), "hello_world.txt");
    }

    #[test]
    fn truncate_drops_tokens_then_chars() {
        assert_eq!(truncate("alpha_beta_gamma.jpg", 14, &opts()), "alpha_beta.jpg");
        assert_eq!(truncate("abcdefghij.jpg", 8, &opts()), "abcd.jpg");
        assert_eq!(truncate("short.jpg", 80, &opts()), "short.jpg");
        assert_eq!(truncate("short.jpg", 0, &opts()), "short.jpg");
    }

    #[test]
    fn dates_are_standardized_when_valid() {
        assert_eq!(
            standardize_dates("trip 17-05-2024.jpg", &opts()),
            "trip 2024-05-17.jpg"
        );
        assert_eq!(
            standardize_dates("IMG_01.02.2023_02-03-2023.jpg", &opts()),
            "IMG_2023-02-01_2023-03-02.jpg"
        );
        assert_eq!(
            standardize_dates("bad 31-02-2024.jpg", &opts()),
            "bad 31-02-2024.jpg"
        );
    }

    #[test]
    fn zero_padding() {
        assert_eq!(remove_zeros("frame_007_000.png", &opts()), "frame_7_0.png");
        assert_eq!(add_zeros("frame_7_12.png", 3, &opts()), "frame_007_012.png");
        assert_eq!(add_zeros("frame_1234.png", 3, &opts()), "frame_1234.png");
        let wide = add_zeros("frame_7.png", 70_000, &opts());
        assert_eq!(wide.len(), "frame_.png".len() + 70_000);
        assert!(wide.ends_with("07.png"));
    }

    #[test]
    fn empty_input_is_unchanged_for_noop_class() {
        let o = opts();
        assert_eq!(remove_repeating("", "a", 0, &o), "");
        assert_eq!(remove_repeating_connected("", "a", &o), "");
        assert_eq!(remove_leading("", "a", &o), "");
        assert_eq!(replace_extension("", "a", "b"), "");
        assert_eq!(standardize_dates("", &o), "");
        assert_eq!(insert_text("", "x", 1, InsertAnchor::Start, &o), "");
    }
}
