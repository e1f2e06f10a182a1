use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use ledgerlens::error::Result;
use ledgerlens::filter::{filter_transactions, StatusFilter};
use ledgerlens::fmt::money;
use ledgerlens::pipeline::{AnalysisReport, ErrorBody};
use ledgerlens::settings::load_settings;

pub fn run(
    file: &str,
    model: Option<&str>,
    json: bool,
    only: StatusFilter,
    search: Option<&str>,
) -> Result<()> {
    let settings = load_settings();
    let pipeline = super::pipeline_for(model, &settings);

    let report = match pipeline.run_path(&PathBuf::from(file)) {
        Ok(report) => report,
        Err(e) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&ErrorBody::from(&e))?);
            }
            return Err(e);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_summary(&report, &settings.currency_symbol);
    print_breakdowns(&report, &settings.currency_symbol);
    print_transactions(&report, only, search, &settings.currency_symbol);
    Ok(())
}

fn print_summary(report: &AnalysisReport, currency: &str) {
    let s = &report.summary;
    let mut table = Table::new();
    table.set_header(vec!["", "Amount"]);
    table.add_row(vec![
        Cell::new("Total Income".green().bold()),
        Cell::new(money(s.total_income, currency)),
    ]);
    table.add_row(vec![
        Cell::new("Total Expenses".red().bold()),
        Cell::new(money(s.total_expenses, currency)),
    ]);
    let balance_label = if s.balance >= 0.0 {
        "Net Balance".green().bold()
    } else {
        "Net Balance".red().bold()
    };
    table.add_row(vec![Cell::new(balance_label), Cell::new(money(s.balance, currency))]);
    table.add_row(vec![Cell::new("Transactions"), Cell::new(s.total_transactions)]);
    table.add_row(vec![
        Cell::new("Anomalies Found".yellow().bold()),
        Cell::new(s.anomalies_found),
    ]);
    println!("Summary\n{table}");
}

fn print_breakdowns(report: &AnalysisReport, currency: &str) {
    let spending = &report.charts_data.category_spending;
    if !spending.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Category", "Spent", "Average"]);
        for (name, total) in spending {
            let avg = report
                .analysis
                .category_averages
                .get(name)
                .copied()
                .unwrap_or_default();
            table.add_row(vec![
                Cell::new(name),
                Cell::new(money(*total, currency)),
                Cell::new(money(avg, currency)),
            ]);
        }
        println!("\nSpending by Category\n{table}");
    }

    let monthly = &report.charts_data.monthly_spending;
    if !monthly.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Month", "Spent"]);
        for (month, total) in monthly {
            table.add_row(vec![Cell::new(month), Cell::new(money(*total, currency))]);
        }
        println!("\nSpending by Month\n{table}");
    }
}

fn print_transactions(
    report: &AnalysisReport,
    only: StatusFilter,
    search: Option<&str>,
    currency: &str,
) {
    let rows = filter_transactions(&report.transactions, only, search);
    if rows.is_empty() {
        println!("\nNo transactions match.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "Category", "Amount", "Status"]);
    for t in rows {
        let r = &t.record;
        let status = if t.is_anomaly() {
            Cell::new("Anomaly".red().bold())
        } else {
            Cell::new("Normal")
        };
        table.add_row(vec![
            Cell::new(&r.raw_date),
            Cell::new(&r.description),
            Cell::new(r.category.as_deref().unwrap_or("-")),
            Cell::new(money(r.amount, currency)),
            status,
        ]);
    }
    println!("\nTransactions\n{table}");
}
