use crate::domain::model::{RunReport, PHONE_NUMBER_COLUMN};
use std::fmt::Write;

/// 執行摘要：失敗的圖片、儲存位置與結果表
pub fn render_report(report: &RunReport) -> String {
    let mut out = String::new();
    let outcome = &report.outcome;

    for failure in &outcome.failures {
        let _ = writeln!(out, "⚠️ {}: {}", failure.image, failure.error);
    }

    if outcome.all_failed() {
        let _ = writeln!(
            out,
            "❌ All {} images failed; nothing was saved.",
            outcome.images_processed
        );
        if let Some(first) = outcome.failures.first() {
            let _ = writeln!(out, "💡 {}", first.error.recovery_suggestion());
        }
        return out;
    }

    if !outcome.has_records() {
        let _ = writeln!(
            out,
            "No phone numbers found in {} images; nothing was saved.",
            outcome.images_processed
        );
        return out;
    }

    match (&report.saved, &report.save_error) {
        (Some(saved), _) => {
            let _ = writeln!(
                out,
                "✅ Phone numbers extracted and saved to {} ({} new, {} total, {})",
                saved.artifact.path,
                saved.appended,
                saved.table.len(),
                saved.artifact.media_type
            );
            render_rows(&mut out, &saved.table.rows);
        }
        (None, Some(e)) => {
            let _ = writeln!(out, "❌ Could not update the result table: {}", e);
            let _ = writeln!(out, "💡 {}", e.recovery_suggestion());
            let _ = writeln!(out, "Numbers found in this run:");
            render_rows(&mut out, &outcome.records);
        }
        (None, None) => render_rows(&mut out, &outcome.records),
    }

    let _ = writeln!(
        out,
        "Finished at {}",
        report.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    out
}

fn render_rows(out: &mut String, rows: &[String]) {
    let width = rows.len().to_string().len();
    let _ = writeln!(out, "{:>width$}  {}", "#", PHONE_NUMBER_COLUMN, width = width);
    for (index, row) in rows.iter().enumerate() {
        let _ = writeln!(out, "{:>width$}  {}", index, row, width = width);
    }
}

pub fn print_report(report: &RunReport) {
    print!("{}", render_report(report));
}
