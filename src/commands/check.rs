use anyhow::Result;
use mintset::{load_records, Assembler, Config, SourceCheck};
use std::path::Path;

pub async fn run(config: Config, records: &Path) -> Result<()> {
    let records = load_records(records)?;
    let include_solutions = config.include_solutions;
    let assembler = Assembler::from_config(config)?;
    let checks = assembler.check(&records, include_solutions).await;

    let mut problems = 0;
    for check in &checks {
        if has_problem(check) {
            problems += 1;
        }
        println!("{}", describe(check));
    }

    println!("{} sources checked, {} with problems", checks.len(), problems);
    Ok(())
}

fn has_problem(check: &SourceCheck) -> bool {
    check.problem.is_some() || !check.out_of_range.is_empty()
}

/// One line per source. Page numbers in `check` are already 1-based.
fn describe(check: &SourceCheck) -> String {
    let reference = check.reference.as_deref().unwrap_or("-");
    let prefix = format!("{} [{}] {}", check.record, check.section, reference);

    if let Some(problem) = &check.problem {
        return format!("{prefix}: {problem}");
    }

    let mut line = format!(
        "{prefix}: {} of {} pages",
        check.pages.len(),
        check.page_count.unwrap_or(0)
    );
    if !check.out_of_range.is_empty() {
        let missing: Vec<String> = check.out_of_range.iter().map(usize::to_string).collect();
        line.push_str(&format!(" (out of range: {})", missing.join(", ")));
    }
    line
}
