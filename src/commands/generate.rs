use anyhow::{Context, Result};
use mintset::selection::{load_bank, sample, Filters, History, QuestionRow};
use mintset::{Assembler, Config, SelectionRecord};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

pub struct GenerateOptions {
    pub count: usize,
    pub filters: Filters,
    pub seed: Option<u64>,
    pub history: Option<PathBuf>,
}

pub async fn run(
    config: Config,
    bank: &Path,
    output: &Path,
    options: &GenerateOptions,
) -> Result<()> {
    let rows = load_bank(bank)?;
    let candidates = options.filters.apply(&rows);
    if candidates.is_empty() {
        anyhow::bail!("No questions match the given filters");
    }

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let picked: Vec<QuestionRow> = match &options.history {
        Some(path) => History::load(path)?
            .sample_unused(&candidates, options.count, &mut rng)
            .context("Failed to update question history")?,
        None => sample(&candidates, options.count, &mut rng),
    };
    if picked.len() < options.count {
        println!(
            "Only {} matching questions available (asked for {})",
            picked.len(),
            options.count
        );
    }

    let records: Vec<SelectionRecord> = picked.iter().map(QuestionRow::to_record).collect();
    for record in &records {
        println!("  {}", record.display_title());
    }

    let include_solutions = config.include_solutions;
    let assembler = Assembler::from_config(config)?;
    let assembly = assembler
        .assemble_with_report(&records, include_solutions)
        .await
        .context("Failed to assemble practice set")?;

    super::write_output(output, &assembly.bytes)?;
    super::print_report(&assembly.report, output);
    Ok(())
}
