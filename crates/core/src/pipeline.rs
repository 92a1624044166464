use crate::case::{convert_case, flip_case, CaseStyle};
use crate::config::DEFAULT_MAX_FILENAME_LEN;
use crate::image_info::{
    add_image_info, add_resolution, remove_resolution, InfoField, MetadataProbe, ResolutionStyle,
};
use crate::naming::TransformOptions;
use crate::transform::{self, InsertAnchor, TimestampGranularity};
use chrono::{DateTime, Local};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// One named transformation with its arguments, as written by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStep {
    pub name: String,
    pub args: Vec<String>,
}

impl OperationStep {
    pub fn new<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for OperationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {arg:?}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),
    #[error("`{operation}` requires argument <{argument}>")]
    MissingArgument {
        operation: String,
        argument: &'static str,
    },
    #[error("`{operation}` takes at most {max} argument(s), got {got}")]
    TooManyArguments {
        operation: String,
        max: usize,
        got: usize,
    },
    #[error("`{operation}`: invalid <{argument}> `{value}`: {reason}")]
    InvalidArgument {
        operation: String,
        argument: &'static str,
        value: String,
        reason: String,
    },
    #[error("`{operation}`: invalid pattern: {reason}")]
    InvalidPattern { operation: String, reason: String },
}

/// A step that did not compile. The step is left out of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDiagnostic {
    pub index: usize,
    pub step: OperationStep,
    pub error: StepError,
}

impl fmt::Display for StepDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} skipped: {}", self.index + 1, self.error)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    pub name: &'static str,
    /// `None` marks a required argument.
    pub default: Option<&'static str>,
}

const fn required(name: &'static str) -> ArgSpec {
    ArgSpec {
        name,
        default: None,
    }
}

const fn optional(name: &'static str, default: &'static str) -> ArgSpec {
    ArgSpec {
        name,
        default: Some(default),
    }
}

/// Registry entry binding an operation name to its arguments and builder.
pub struct OperationSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub args: &'static [ArgSpec],
    pub help: &'static str,
    build: fn(&StepArgs<'_>) -> Result<Transform, StepError>,
}

impl OperationSpec {
    /// `replace <old> [new]`
    pub fn usage(&self) -> String {
        let mut out = self.name.to_string();
        for arg in self.args {
            match arg.default {
                None => out.push_str(&format!(" <{}>", arg.name)),
                Some(_) => out.push_str(&format!(" [{}]", arg.name)),
            }
        }
        out
    }

    fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }
}

impl fmt::Debug for OperationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationSpec")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("args", &self.args)
            .finish()
    }
}

/// Arguments of one step after defaults were filled in.
pub struct StepArgs<'a> {
    operation: &'a str,
    spec: &'static [ArgSpec],
    values: Vec<String>,
}

impl StepArgs<'_> {
    fn text(&self, index: usize) -> String {
        self.values[index].clone()
    }

    fn parse<T>(&self, index: usize) -> Result<T, StepError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let value = &self.values[index];
        value.trim().parse::<T>().map_err(|err| StepError::InvalidArgument {
            operation: self.operation.to_string(),
            argument: self.spec[index].name,
            value: value.clone(),
            reason: err.to_string(),
        })
    }

    fn parse_at_most(&self, index: usize, max: usize) -> Result<usize, StepError> {
        let value = self.parse::<usize>(index)?;
        if value > max {
            return Err(StepError::InvalidArgument {
                operation: self.operation.to_string(),
                argument: self.spec[index].name,
                value: self.values[index].clone(),
                reason: format!("must be at most {max}"),
            });
        }
        Ok(value)
    }
}

/// Widest zero padding `add_zeros` accepts; no file name can be longer.
const MAX_PAD_WIDTH: usize = DEFAULT_MAX_FILENAME_LEN;

static OPERATIONS: &[OperationSpec] = &[
    OperationSpec {
        name: "case",
        aliases: &[],
        args: &[required("style")],
        help: "convert case: upper lower snake camel pascal kebab title space",
        build: |a| Ok(Transform::Case(a.parse(0)?)),
    },
    OperationSpec {
        name: "upper",
        aliases: &["uppercase"],
        args: &[],
        help: "UPPERCASE",
        build: |_| Ok(Transform::Case(CaseStyle::Upper)),
    },
    OperationSpec {
        name: "lower",
        aliases: &["lowercase"],
        args: &[],
        help: "lowercase",
        build: |_| Ok(Transform::Case(CaseStyle::Lower)),
    },
    OperationSpec {
        name: "snake",
        aliases: &["snake_case"],
        args: &[],
        help: "snake_case",
        build: |_| Ok(Transform::Case(CaseStyle::Snake)),
    },
    OperationSpec {
        name: "camel",
        aliases: &["camel_case"],
        args: &[],
        help: "camelCase",
        build: |_| Ok(Transform::Case(CaseStyle::Camel)),
    },
    OperationSpec {
        name: "pascal",
        aliases: &["pascal_case"],
        args: &[],
        help: "PascalCase",
        build: |_| Ok(Transform::Case(CaseStyle::Pascal)),
    },
    OperationSpec {
        name: "kebab",
        aliases: &["kebab_case"],
        args: &[],
        help: "kebab-case",
        build: |_| Ok(Transform::Case(CaseStyle::Kebab)),
    },
    OperationSpec {
        name: "title",
        aliases: &["title_case"],
        args: &[],
        help: "Title Case",
        build: |_| Ok(Transform::Case(CaseStyle::Title)),
    },
    OperationSpec {
        name: "case_flip",
        aliases: &["flip_case"],
        args: &[],
        help: "swap upper and lower case",
        build: |_| Ok(Transform::FlipCase),
    },
    OperationSpec {
        name: "replace",
        aliases: &[],
        args: &[required("old"), optional("new", "")],
        help: "replace text (ASCII case-insensitive)",
        build: |a| {
            Ok(Transform::Replace {
                old: a.text(0),
                new: a.text(1),
            })
        },
    },
    OperationSpec {
        name: "replace_regex",
        aliases: &["regex"],
        args: &[required("pattern"), optional("replacement", "")],
        help: "replace a regex; $1 refers to capture groups",
        build: |a| {
            let pattern = Regex::new(&a.values[0]).map_err(|err| StepError::InvalidPattern {
                operation: a.operation.to_string(),
                reason: err.to_string(),
            })?;
            Ok(Transform::ReplacePattern {
                pattern,
                replacement: a.text(1),
            })
        },
    },
    OperationSpec {
        name: "replace_index",
        aliases: &["replace_word"],
        args: &[required("separator"), required("index"), required("new_text")],
        help: "replace the INDEX-th word split on SEPARATOR",
        build: |a| {
            Ok(Transform::ReplaceWord {
                separator: a.text(0),
                index: a.parse(1)?,
                new_text: a.text(2),
            })
        },
    },
    OperationSpec {
        name: "replace_ext",
        aliases: &[],
        args: &[required("old"), required("new")],
        help: "swap the extension when it matches",
        build: |a| {
            Ok(Transform::ReplaceExtension {
                old: a.text(0),
                new: a.text(1),
            })
        },
    },
    OperationSpec {
        name: "remove_numbers",
        aliases: &[],
        args: &[],
        help: "remove all digits",
        build: |_| Ok(Transform::RemoveNumbers),
    },
    OperationSpec {
        name: "remove_special",
        aliases: &[],
        args: &[],
        help: "keep only letters, digits, dots and underscores",
        build: |_| Ok(Transform::RemoveSpecial),
    },
    OperationSpec {
        name: "remove_non_ascii",
        aliases: &[],
        args: &[],
        help: "remove non-ASCII characters",
        build: |_| Ok(Transform::RemoveNonAscii),
    },
    OperationSpec {
        name: "remove_leading",
        aliases: &[],
        args: &[required("text")],
        help: "strip leading repeats of TEXT",
        build: |a| Ok(Transform::RemoveLeading(a.text(0))),
    },
    OperationSpec {
        name: "remove_trailing",
        aliases: &[],
        args: &[required("text")],
        help: "strip trailing repeats of TEXT",
        build: |a| Ok(Transform::RemoveTrailing(a.text(0))),
    },
    OperationSpec {
        name: "remove_duplicates",
        aliases: &[],
        args: &[],
        help: "drop repeated words",
        build: |_| Ok(Transform::RemoveDuplicates),
    },
    OperationSpec {
        name: "remove_repeating",
        aliases: &[],
        args: &[required("text"), optional("keep_index", "0")],
        help: "remove all occurrences of TEXT but the KEEP_INDEX-th",
        build: |a| {
            Ok(Transform::RemoveRepeating {
                text: a.text(0),
                keep_index: a.parse(1)?,
            })
        },
    },
    OperationSpec {
        name: "remove_repeating_connected",
        aliases: &[],
        args: &[required("text")],
        help: "collapse consecutive repeats of TEXT",
        build: |a| Ok(Transform::RemoveRepeatingConnected(a.text(0))),
    },
    OperationSpec {
        name: "remove_resolution",
        aliases: &[],
        args: &[optional("style", "tag")],
        help: "strip resolution tags (tag) or WxH suffixes (exact)",
        build: |a| Ok(Transform::RemoveResolution(a.parse(0)?)),
    },
    OperationSpec {
        name: "remove_zeros",
        aliases: &[],
        args: &[],
        help: "strip leading zeros from numbers",
        build: |_| Ok(Transform::RemoveZeros),
    },
    OperationSpec {
        name: "add_zeros",
        aliases: &[],
        args: &[required("width")],
        help: "left-pad numbers with zeros to WIDTH",
        build: |a| Ok(Transform::AddZeros(a.parse_at_most(0, MAX_PAD_WIDTH)?)),
    },
    OperationSpec {
        name: "standardize_dates",
        aliases: &[],
        args: &[],
        help: "rewrite DD-MM-YYYY dates as YYYY-MM-DD",
        build: |_| Ok(Transform::StandardizeDates),
    },
    OperationSpec {
        name: "prefix",
        aliases: &["add_prefix"],
        args: &[required("text")],
        help: "prepend TEXT",
        build: |a| Ok(Transform::Prefix(a.text(0))),
    },
    OperationSpec {
        name: "suffix",
        aliases: &["add_suffix"],
        args: &[required("text")],
        help: "append TEXT before the extension",
        build: |a| Ok(Transform::Suffix(a.text(0))),
    },
    OperationSpec {
        name: "insert_text",
        aliases: &["insert"],
        args: &[required("text"), required("position"), required("index")],
        help: "insert TEXT at INDEX counted from POSITION (start|end)",
        build: |a| {
            Ok(Transform::Insert {
                text: a.text(0),
                anchor: a.parse(1)?,
                index: a.parse(2)?,
            })
        },
    },
    OperationSpec {
        name: "add_timestamp",
        aliases: &["timestamp"],
        args: &[optional("granularity", "second")],
        help: "append the current time: year month day hour minute second",
        build: |a| Ok(Transform::Timestamp(a.parse(0)?)),
    },
    OperationSpec {
        name: "add_resolution",
        aliases: &["resolution"],
        args: &[optional("style", "tag")],
        help: "append the image resolution (exact|tag)",
        build: |a| Ok(Transform::Resolution(a.parse(0)?)),
    },
    OperationSpec {
        name: "add_image_info",
        aliases: &["image_info"],
        args: &[optional("field", "both")],
        help: "append image type and bit depth (type|bits|both)",
        build: |a| Ok(Transform::ImageInfo(a.parse(0)?)),
    },
    OperationSpec {
        name: "reverse",
        aliases: &[],
        args: &[],
        help: "reverse the name",
        build: |_| Ok(Transform::Reverse),
    },
    OperationSpec {
        name: "trim",
        aliases: &[],
        args: &[],
        help: "trim surrounding whitespace",
        build: |_| Ok(Transform::Trim),
    },
    OperationSpec {
        name: "replace_spaces",
        aliases: &[],
        args: &[],
        help: "spaces to underscores",
        build: |_| Ok(Transform::ReplaceSpaces),
    },
    OperationSpec {
        name: "clean",
        aliases: &[],
        args: &[],
        help: "collapse separator runs and trim separators",
        build: |_| Ok(Transform::Clean),
    },
    OperationSpec {
        name: "truncate",
        aliases: &["shorten"],
        args: &[required("max_len")],
        help: "shorten to MAX_LEN characters",
        build: |a| Ok(Transform::Truncate(a.parse(0)?)),
    },
];

/// All registered operations in help order.
pub fn operations() -> &'static [OperationSpec] {
    OPERATIONS
}

/// Looks an operation up by name or alias. `-` and `_` are interchangeable
/// and leading dashes are ignored.
pub fn lookup(name: &str) -> Option<&'static OperationSpec> {
    let key = normalize_name(name);
    OPERATIONS.iter().find(|spec| spec.answers_to(&key))
}

fn normalize_name(name: &str) -> String {
    name.trim()
        .trim_start_matches('-')
        .to_ascii_lowercase()
        .replace('-', "_")
}

/// A step bound to its typed arguments.
#[derive(Debug, Clone)]
pub enum Transform {
    Case(CaseStyle),
    FlipCase,
    Replace {
        old: String,
        new: String,
    },
    ReplacePattern {
        pattern: Regex,
        replacement: String,
    },
    ReplaceWord {
        separator: String,
        index: usize,
        new_text: String,
    },
    ReplaceExtension {
        old: String,
        new: String,
    },
    RemoveNumbers,
    RemoveSpecial,
    RemoveNonAscii,
    RemoveLeading(String),
    RemoveTrailing(String),
    RemoveDuplicates,
    RemoveRepeating {
        text: String,
        keep_index: usize,
    },
    RemoveRepeatingConnected(String),
    RemoveResolution(ResolutionStyle),
    RemoveZeros,
    AddZeros(usize),
    StandardizeDates,
    Prefix(String),
    Suffix(String),
    Insert {
        text: String,
        anchor: InsertAnchor,
        index: usize,
    },
    Timestamp(TimestampGranularity),
    Resolution(ResolutionStyle),
    ImageInfo(InfoField),
    Reverse,
    Trim,
    ReplaceSpaces,
    Clean,
    Truncate(usize),
}

/// Per-file side information for steps that look beyond the name.
#[derive(Clone, Copy)]
pub struct FileContext<'a> {
    pub path: &'a Path,
    pub now: DateTime<Local>,
    pub probe: &'a dyn MetadataProbe,
}

impl Transform {
    pub fn apply(&self, name: &str, ctx: &FileContext<'_>, opts: &TransformOptions) -> String {
        match self {
            Self::Case(style) => convert_case(name, *style, opts),
            Self::FlipCase => flip_case(name, opts),
            Self::Replace { old, new } => transform::replace_literal(name, old, new, opts),
            Self::ReplacePattern {
                pattern,
                replacement,
            } => transform::replace_pattern(name, pattern, replacement, opts),
            Self::ReplaceWord {
                separator,
                index,
                new_text,
            } => transform::replace_word_by_index(name, separator, *index, new_text, opts),
            Self::ReplaceExtension { old, new } => transform::replace_extension(name, old, new),
            Self::RemoveNumbers => transform::remove_numbers(name, opts),
            Self::RemoveSpecial => transform::remove_special(name, opts),
            Self::RemoveNonAscii => transform::remove_non_ascii(name, opts),
            Self::RemoveLeading(run) => transform::remove_leading(name, run, opts),
            Self::RemoveTrailing(run) => transform::remove_trailing(name, run, opts),
            Self::RemoveDuplicates => transform::remove_duplicates(name, opts),
            Self::RemoveRepeating { text, keep_index } => {
                transform::remove_repeating(name, text, *keep_index, opts)
            }
            Self::RemoveRepeatingConnected(text) => {
                transform::remove_repeating_connected(name, text, opts)
            }
            Self::RemoveResolution(style) => remove_resolution(name, *style, opts),
            Self::RemoveZeros => transform::remove_zeros(name, opts),
            Self::AddZeros(width) => transform::add_zeros(name, *width, opts),
            Self::StandardizeDates => transform::standardize_dates(name, opts),
            Self::Prefix(text) => transform::add_prefix(name, text),
            Self::Suffix(text) => transform::add_suffix(name, text, opts),
            Self::Insert {
                text,
                anchor,
                index,
            } => transform::insert_text(name, text, *index, *anchor, opts),
            Self::Timestamp(granularity) => {
                transform::add_timestamp(name, *granularity, ctx.now, opts)
            }
            Self::Resolution(style) => {
                let resolution = ctx.probe.resolution(ctx.path);
                if resolution.is_none() {
                    warn!(path = %ctx.path.display(), "could not read image resolution, name left unchanged");
                }
                add_resolution(name, *style, resolution, opts)
            }
            Self::ImageInfo(field) => {
                let info = ctx.probe.image_info(ctx.path);
                if info.is_none() {
                    warn!(path = %ctx.path.display(), "could not read image info, name left unchanged");
                }
                add_image_info(name, *field, info.as_ref(), opts)
            }
            Self::Reverse => transform::reverse(name, opts),
            Self::Trim => transform::trim(name, opts),
            Self::ReplaceSpaces => transform::replace_spaces(name, opts),
            Self::Clean => transform::clean(name, opts),
            Self::Truncate(limit) => transform::truncate(name, *limit, opts),
        }
    }
}

/// Ordered, compiled transformations applied as a left fold.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<Transform>,
    options: TransformOptions,
}

/// Result of [`Pipeline::compile`]: the steps that compiled plus one
/// diagnostic per dropped step.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub pipeline: Pipeline,
    pub diagnostics: Vec<StepDiagnostic>,
}

impl Pipeline {
    /// Binds every step against the registry. A step that fails to bind is
    /// dropped with a diagnostic; its siblings still compile.
    pub fn compile(steps: &[OperationStep], options: TransformOptions) -> Compiled {
        let mut compiled = Vec::with_capacity(steps.len());
        let mut diagnostics = Vec::new();

        for (index, step) in steps.iter().enumerate() {
            match compile_step(step) {
                Ok(transform) => compiled.push(transform),
                Err(error) => {
                    warn!(step = %step, %error, "skipping step");
                    diagnostics.push(StepDiagnostic {
                        index,
                        step: step.clone(),
                        error,
                    });
                }
            }
        }

        Compiled {
            pipeline: Pipeline {
                steps: compiled,
                options,
            },
            diagnostics,
        }
    }

    pub fn apply(&self, name: &str, ctx: &FileContext<'_>) -> String {
        self.steps
            .iter()
            .fold(name.to_string(), |current, step| {
                step.apply(&current, ctx, &self.options)
            })
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn options(&self) -> TransformOptions {
        self.options
    }
}

fn compile_step(step: &OperationStep) -> Result<Transform, StepError> {
    let spec = lookup(&step.name).ok_or_else(|| StepError::UnknownOperation(step.name.clone()))?;

    if step.args.len() > spec.args.len() {
        return Err(StepError::TooManyArguments {
            operation: spec.name.to_string(),
            max: spec.args.len(),
            got: step.args.len(),
        });
    }

    let mut values = Vec::with_capacity(spec.args.len());
    for (index, arg) in spec.args.iter().enumerate() {
        match (step.args.get(index), arg.default) {
            (Some(given), _) => values.push(given.clone()),
            (None, Some(default)) => values.push(default.to_string()),
            (None, None) => {
                return Err(StepError::MissingArgument {
                    operation: spec.name.to_string(),
                    argument: arg.name,
                })
            }
        }
    }

    (spec.build)(&StepArgs {
        operation: spec.name,
        spec: spec.args,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_info::ImageInfo;
    use crate::probe::NoProbe;
    use chrono::TimeZone;
    use proptest::prelude::*;

    struct FixedProbe;

    impl MetadataProbe for FixedProbe {
        fn resolution(&self, _path: &Path) -> Option<(u32, u32)> {
            Some((2048, 2048))
        }

        fn image_info(&self, _path: &Path) -> Option<ImageInfo> {
            Some(ImageInfo {
                kind: "RGB".to_string(),
                bit_depth: "8".to_string(),
            })
        }
    }

    fn ctx(probe: &dyn MetadataProbe) -> FileContext<'_> {
        FileContext {
            path: Path::new("/photos/IMG_Holiday.JPG"),
            now: Local
                .with_ymd_and_hms(2024, 3, 9, 14, 5, 30)
                .single()
                .expect("valid local time"),
            probe,
        }
    }

    fn step(name: &str, args: &[&str]) -> OperationStep {
        OperationStep::new(name, args.iter().copied())
    }

    fn run(steps: &[OperationStep], name: &str) -> String {
        let compiled = Pipeline::compile(steps, TransformOptions::default());
        assert!(compiled.diagnostics.is_empty(), "{:?}", compiled.diagnostics);
        compiled.pipeline.apply(name, &ctx(&NoProbe))
    }

    #[test]
    fn snake_then_replace() {
        let steps = [step("case", &["snake"]), step("replace", &["IMG", "photo"])];
        assert_eq!(run(&steps, "IMG_Holiday.JPG"), "photo_holiday.JPG");
    }

    #[test]
    fn order_is_kept() {
        let a = [step("prefix", &["x_"]), step("upper", &[])];
        let b = [step("upper", &[]), step("prefix", &["x_"])];
        assert_eq!(run(&a, "name.txt"), "X_NAME.txt");
        assert_eq!(run(&b, "name.txt"), "x_NAME.txt");
    }

    #[test]
    fn unknown_operation_is_skipped_with_diagnostic() {
        let steps = [
            step("shout", &[]),
            step("suffix", &["_v2"]),
            step("replace", &[]),
            step("add_zeros", &["wide"]),
        ];
        let compiled = Pipeline::compile(&steps, TransformOptions::default());

        assert_eq!(compiled.pipeline.len(), 1);
        assert_eq!(compiled.diagnostics.len(), 3);
        assert_eq!(
            compiled.diagnostics[0].error,
            StepError::UnknownOperation("shout".to_string())
        );
        assert_eq!(compiled.diagnostics[1].index, 2);
        assert!(matches!(
            compiled.diagnostics[1].error,
            StepError::MissingArgument {
                argument: "old",
                ..
            }
        ));
        assert!(matches!(
            compiled.diagnostics[2].error,
            StepError::InvalidArgument {
                argument: "width",
                ..
            }
        ));
        assert_eq!(compiled.pipeline.apply("a.txt", &ctx(&NoProbe)), "a_v2.txt");
    }

    #[test]
    fn oversized_padding_width_is_rejected() {
        let steps = [
            step("add_zeros", &["99999999999999999"]),
            step("add_zeros", &["70000"]),
            step("add_zeros", &["3"]),
        ];
        let compiled = Pipeline::compile(&steps, TransformOptions::default());
        assert_eq!(compiled.diagnostics.len(), 2);
        assert!(compiled.diagnostics.iter().all(|d| matches!(
            d.error,
            StepError::InvalidArgument {
                argument: "width",
                ..
            }
        )));
        assert_eq!(
            compiled.pipeline.apply("frame_7.png", &ctx(&NoProbe)),
            "frame_007.png"
        );
    }

    #[test]
    fn bad_regex_drops_only_that_step() {
        let steps = [step("replace_regex", &["(unclosed"]), step("lower", &[])];
        let compiled = Pipeline::compile(&steps, TransformOptions::default());
        assert!(matches!(
            compiled.diagnostics[0].error,
            StepError::InvalidPattern { .. }
        ));
        assert_eq!(compiled.pipeline.apply("ABC.TXT", &ctx(&NoProbe)), "abc.TXT");
    }

    #[test]
    fn too_many_arguments_is_rejected() {
        let compiled = Pipeline::compile(&[step("trim", &["x"])], TransformOptions::default());
        assert!(compiled.pipeline.is_empty());
        assert!(matches!(
            compiled.diagnostics[0].error,
            StepError::TooManyArguments { max: 0, got: 1, .. }
        ));
    }

    #[test]
    fn defaults_fill_optional_arguments() {
        assert_eq!(run(&[step("replace", &["_copy"])], "a_copy.txt"), "a.txt");
        assert_eq!(
            run(&[step("remove_repeating", &["a"])], "a_b_a.txt"),
            "a_b_.txt"
        );
    }

    #[test]
    fn names_and_aliases_resolve() {
        assert_eq!(lookup("--title-case").map(|s| s.name), Some("title"));
        assert_eq!(lookup("Add-Prefix").map(|s| s.name), Some("prefix"));
        assert!(lookup("nope").is_none());
        assert_eq!(
            lookup("replace").map(OperationSpec::usage).as_deref(),
            Some("replace <old> [new]")
        );
    }

    #[test]
    fn timestamp_uses_context_clock() {
        assert_eq!(
            run(&[step("add_timestamp", &["day"])], "scan.pdf"),
            "scan_2024-03-09.pdf"
        );
        assert_eq!(
            run(&[step("add_timestamp", &[])], "scan.pdf"),
            "scan_2024-03-09_14-05-30.pdf"
        );
    }

    #[test]
    fn probe_backed_steps() {
        let steps = [step("add_resolution", &[]), step("add_image_info", &[])];
        let compiled = Pipeline::compile(&steps, TransformOptions::default());
        assert_eq!(
            compiled.pipeline.apply("tex.png", &ctx(&FixedProbe)),
            "tex_2K_RGB_8.png"
        );
        assert_eq!(compiled.pipeline.apply("tex.png", &ctx(&NoProbe)), "tex.png");
    }

    #[test]
    fn insert_text_argument_order() {
        assert_eq!(
            run(&[step("insert_text", &["-", "end", "2"])], "abcd.txt"),
            "ab-cd.txt"
        );
    }

    proptest! {
        #[test]
        fn empty_pipeline_is_identity(name in "\\PC{0,24}") {
            let compiled = Pipeline::compile(&[], TransformOptions::default());
            prop_assert_eq!(compiled.pipeline.apply(&name, &ctx(&NoProbe)), name);
        }
    }
}
