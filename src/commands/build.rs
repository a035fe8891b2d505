use anyhow::{Context, Result};
use mintset::{load_records, Assembler, Config};
use std::path::Path;

pub async fn run(config: Config, records: &Path, output: &Path) -> Result<()> {
    let records = load_records(records)?;
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
