pub mod build;
pub mod cache;
pub mod check;
pub mod generate;
pub mod pages;

use anyhow::{Context, Result};
use mintset::BuildReport;
use std::path::Path;

pub(crate) fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

pub(crate) fn print_report(report: &BuildReport, output: &Path) {
    println!(
        "Wrote {} pages to {} ({} cover, {} question, {} solution)",
        report.total_pages(),
        output.display(),
        report.cover_pages,
        report.question_pages,
        report.solution_pages,
    );
    if !report.skipped.is_empty() {
        println!("Skipped {}:", report.skipped.len());
        for skip in &report.skipped {
            println!("  {}", skip);
        }
    }
}
