use comfy_table::{Cell, Table};

use ledgerlens::error::Result;
use ledgerlens::settings::load_settings;

pub fn run(model: Option<&str>) -> Result<()> {
    let settings = load_settings();
    let pipeline = super::pipeline_for(model, &settings);
    let scorer = pipeline.scorer().get()?;

    let mut table = Table::new();
    table.set_header(vec!["#", "Feature"]);
    for (i, column) in scorer.schema().columns().iter().enumerate() {
        table.add_row(vec![Cell::new(i), Cell::new(column)]);
    }
    println!("Model: {}\n{table}", scorer.name());
    Ok(())
}
