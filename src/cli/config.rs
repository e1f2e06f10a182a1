use ledgerlens::error::Result;
use ledgerlens::settings::{load_settings, save_settings, settings_path, shellexpand_path};

pub fn show() -> Result<()> {
    let s = load_settings();
    println!("Settings:         {}", settings_path().display());
    println!("Model:            {}", s.model_path);
    println!("Currency:         {}", s.currency_symbol);
    println!("Large income:     {}", s.large_income_threshold);
    println!("Expense multiple: {}", s.expense_multiple);
    Ok(())
}

pub fn set_model(path: &str) -> Result<()> {
    let mut s = load_settings();
    s.model_path = shellexpand_path(path);
    save_settings(&s)?;
    println!("Model path set to {}", s.model_path);
    Ok(())
}

pub fn set_currency(symbol: &str) -> Result<()> {
    let mut s = load_settings();
    s.currency_symbol = symbol.to_string();
    save_settings(&s)?;
    println!("Currency symbol set to {symbol}");
    Ok(())
}
