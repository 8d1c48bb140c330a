use super::{rate, ui};
use crate::core::category::{Category, TransactionKind};
use crate::core::config::CurrencyConfig;
use crate::core::convert;
use crate::App;
use crate::providers::caching::RateCache;
use anyhow::{Result, anyhow};
use comfy_table::{Cell, CellAlignment};

/// Balances table with a foreign-currency column; `rate` is local units per
/// foreign unit.
pub fn display_categories(categories: &[Category], rate: f64, currency: &CurrencyConfig) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Category"),
        ui::header_cell(&format!("Balance ({})", currency.local)),
        ui::header_cell(&format!("Balance ({})", currency.foreign)),
        ui::header_cell("Transactions"),
    ]);

    for category in categories {
        table.add_row(vec![
            Cell::new(&category.name),
            ui::money_cell(category.balance, &currency.local),
            ui::money_cell(convert::to_foreign(category.balance, rate), &currency.foreign),
            Cell::new(category.transactions.len()).set_alignment(CellAlignment::Right),
        ]);
    }

    let total: f64 = categories.iter().map(|c| c.balance).sum();
    let total_style = if total < 0.0 {
        ui::StyleType::Error
    } else {
        ui::StyleType::TotalValue
    };

    let mut output = table.to_string();
    output.push_str(&format!(
        "\n\n{}: {} (≈ {})",
        ui::style_text("Total Balance", ui::StyleType::TotalLabel),
        ui::style_text(&ui::format_money(total, &currency.local), total_style),
        ui::format_money(convert::to_foreign(total, rate), &currency.foreign)
    ));
    output
}

pub fn display_history(category: &Category, currency: &CurrencyConfig) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Type"),
        ui::header_cell(&format!("Amount ({})", currency.local)),
        ui::header_cell("Note"),
    ]);

    for transaction in category.transactions.iter().rev() {
        table.add_row(vec![
            Cell::new(transaction.timestamp.format("%Y-%m-%d %H:%M")),
            Cell::new(transaction.kind),
            ui::money_cell(transaction.signed_amount(), &currency.local),
            Cell::new(transaction.note.as_deref().unwrap_or("")),
        ]);
    }

    format!(
        "Category: {}\n\n{}\n\nBalance: {}",
        ui::style_text(&category.name, ui::StyleType::Title),
        table,
        ui::style_text(
            &ui::format_money(category.balance, &currency.local),
            ui::StyleType::TotalValue
        )
    )
}

/// Turns a user-entered amount into local currency, converting it first when
/// it was given in the foreign currency.
async fn local_amount(amount: f64, foreign: bool, cache: &RateCache) -> f64 {
    if foreign {
        let quote = rate::fetch_quote(cache).await;
        convert::to_local(amount, quote.rate)
    } else {
        amount
    }
}

pub async fn run_list(app: &App) -> Result<()> {
    let currency = &app.config.currency;
    let categories = app.ledger.list().await?;
    if categories.is_empty() {
        println!(
            "{}",
            ui::style_text(
                "No categories yet. Create one with `moneystack add <name>`.",
                ui::StyleType::Subtle
            )
        );
        return Ok(());
    }

    let quote = rate::fetch_quote(&app.rates).await;
    println!("{}", display_categories(&categories, quote.rate, currency));
    println!(
        "{}",
        ui::style_text(
            &format!(
                "1 {} = {} ({} rate)",
                currency.foreign,
                ui::format_money(quote.rate, &currency.local),
                quote.origin
            ),
            ui::StyleType::Subtle
        )
    );
    Ok(())
}

pub async fn run_add(app: &App, name: &str, initial: f64, foreign: bool) -> Result<()> {
    let currency = &app.config.currency;
    let initial = local_amount(initial, foreign, &app.rates).await;
    let category = app.ledger.create(name, initial).await?;
    println!(
        "Created {} with {}",
        ui::style_text(&category.name, ui::StyleType::Title),
        ui::format_money(category.balance, &currency.local)
    );
    Ok(())
}

pub async fn run_record(
    app: &App,
    name: &str,
    kind: TransactionKind,
    amount: f64,
    note: Option<String>,
    foreign: bool,
) -> Result<()> {
    let currency = &app.config.currency;
    let amount = local_amount(amount, foreign, &app.rates).await;
    let category = app.ledger.record(name, kind, amount, note).await?;
    let verb = match kind {
        TransactionKind::Add => "Added",
        TransactionKind::Subtract => "Subtracted",
    };
    println!(
        "{} {} ({}), balance now {}",
        verb,
        ui::format_money(amount, &currency.local),
        category.name,
        ui::style_text(
            &ui::format_money(category.balance, &currency.local),
            ui::StyleType::TotalValue
        )
    );
    Ok(())
}

pub async fn run_history(app: &App, name: &str) -> Result<()> {
    let category = app
        .ledger
        .get(name)
        .await?
        .ok_or_else(|| anyhow!("Category not found: {}", name.trim()))?;
    println!("{}", display_history(&category, &app.config.currency));
    Ok(())
}

pub async fn run_remove(app: &App, name: &str) -> Result<()> {
    let category = app.ledger.delete(name).await?;
    println!("Removed {}", category.name);
    Ok(())
}
