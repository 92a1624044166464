use anyhow::Result;
use namnbyte_core::{
    operations, OutputFormat, PendingRow, RunReport, RunStats, SessionStatus, StepDiagnostic,
};

pub fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Table => print_table(report),
    }
    Ok(())
}

fn print_table(report: &RunReport) {
    println!("from -> to (status)");
    for file in &report.files {
        println!(
            "{} -> {} ({})",
            file.from.display(),
            file.to.display(),
            file.status
        );
    }
    println!("\n{}", stats_line(&report.stats));
    if report.preview {
        eprintln!("preview: no files were changed.");
    }
}

fn stats_line(stats: &RunStats) -> String {
    format!(
        "summary: considered={} filtered_out={} unchanged={} renamed={} previewed={} declined={} skipped={} failed={}",
        stats.considered,
        stats.filtered_out,
        stats.unchanged,
        stats.renamed,
        stats.previewed,
        stats.declined,
        stats.skipped,
        stats.failed
    )
}

pub fn print_diagnostics(diagnostics: &[StepDiagnostic]) {
    for diagnostic in diagnostics {
        eprintln!(
            "step {} skipped ({}): {}",
            diagnostic.index + 1,
            diagnostic.step,
            diagnostic.error
        );
    }
}

pub fn print_pending(rows: &[PendingRow]) {
    if rows.is_empty() {
        println!("no pending renames");
        return;
    }
    for row in rows {
        println!("{} -> {}", row.from.display(), row.to.display());
    }
}

pub fn print_status(status: &SessionStatus) {
    let s = &status.summary;
    println!(
        "folders={}/{} files={}/{} size={} pending={} undo={}",
        s.enabled_folders_count,
        s.folders_count,
        s.enabled_files_count,
        s.files_count,
        s.total_size,
        status.pending,
        status.undo_depth
    );
}

pub fn print_operations() {
    let width = operations()
        .iter()
        .map(|op| op.usage().len())
        .max()
        .unwrap_or(0);
    for op in operations() {
        let mut line = format!("{:<width$}  {}", op.usage(), op.help);
        if !op.aliases.is_empty() {
            line.push_str(&format!(" (aliases: {})", op.aliases.join(", ")));
        }
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_line_lists_every_counter() {
        let stats = RunStats {
            considered: 3,
            renamed: 2,
            skipped: 1,
            ..RunStats::default()
        };
        assert_eq!(
            stats_line(&stats),
            "summary: considered=3 filtered_out=0 unchanged=0 renamed=2 previewed=0 declined=0 skipped=1 failed=0"
        );
    }
}
