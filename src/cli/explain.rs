use std::path::PathBuf;

use colored::Colorize;

use ledgerlens::error::Result;
use ledgerlens::explain::explain_anomalies;
use ledgerlens::fmt::money;
use ledgerlens::settings::load_settings;

pub fn run(file: &str, model: Option<&str>) -> Result<()> {
    let settings = load_settings();
    let pipeline = super::pipeline_for(model, &settings);
    let report = pipeline.run_path(&PathBuf::from(file))?;

    let explained = explain_anomalies(&report, &settings.explain_config());
    if explained.is_empty() {
        println!("No anomalies found.");
        return Ok(());
    }

    println!("{} anomalies found\n", explained.len());
    for (tx, explanation) in explained {
        let r = &tx.record;
        println!(
            "{} {} {} ({})",
            r.raw_date,
            r.description.bold(),
            money(r.amount, &settings.currency_symbol),
            r.category.as_deref().unwrap_or("uncategorized"),
        );
        let text = textwrap::fill(&explanation.describe(&settings.currency_symbol), 76);
        for line in text.lines() {
            println!("    {line}");
        }
        println!();
    }
    Ok(())
}
