pub mod case;
mod commit;
mod config;
mod filter;
mod history;
pub mod image_info;
mod journal;
mod model;
pub mod naming;
mod orchestrator;
mod pipeline;
mod probe;
mod scan;
mod session;
mod store;
pub mod transform;

pub use case::CaseStyle;
pub use commit::{CommitOutcome, Committer, FsCommitter};
pub use config::{
    app_paths, load_config, load_config_from, save_config, save_config_to, AppConfig, AppPaths,
    OutputFormat, DEFAULT_MAX_FILENAME_LEN,
};
pub use filter::{parse_date, FileFilter, FilterError, FilterSpec, PathMeta, DATE_FORMAT};
pub use history::{History, HistorySnapshot};
pub use image_info::{ImageInfo, MetadataProbe};
pub use journal::{Journal, RenameOperation, UndoResult};
pub use model::{FileId, FileRecord, FolderId, FolderRecord, Summary};
pub use naming::{InvalidName, TransformOptions};
pub use orchestrator::{
    AssumeYes, Confirm, FileReport, FileStatus, Orchestrator, RunOptions, RunReport, RunStats,
    SkipReason, StageResult,
};
pub use pipeline::{
    lookup, operations, ArgSpec, Compiled, FileContext, OperationSpec, OperationStep, Pipeline,
    StepDiagnostic, StepError, Transform,
};
pub use probe::{ExifProbe, NoProbe};
pub use scan::{scan, ScanOptions, ScanResult, ScanStats, ScannedEntry};
pub use session::{Command, PendingRow, Reply, Session, SessionStatus};
pub use store::{full_summary, Delta, Observer, ObserverId, StateStore, SummaryDelta};
