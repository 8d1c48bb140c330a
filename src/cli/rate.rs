use super::ui;
use crate::core::config::CurrencyConfig;
use crate::core::convert::{self, Direction};
use crate::core::rate::{RateOrigin, RateQuote};
use crate::App;
use crate::providers::caching::RateCache;
use anyhow::{Result, bail};
use chrono::{DateTime, Utc};

/// Acquires the current rate behind a spinner.
pub async fn fetch_quote(cache: &RateCache) -> RateQuote {
    let spinner = ui::new_spinner("Fetching exchange rate...");
    let quote = cache.quote().await;
    spinner.finish_and_clear();
    quote
}

fn describe_age(as_of: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - as_of).num_minutes().max(0);
    match minutes {
        0 => "just now".to_string(),
        1..=59 => format!("{minutes} min ago"),
        60..=2879 => format!("{} h ago", minutes / 60),
        _ => format!("{} days ago", minutes / (60 * 24)),
    }
}

pub fn render_quote(quote: &RateQuote, currency: &CurrencyConfig, now: DateTime<Utc>) -> String {
    let headline = format!(
        "1 {} = {}",
        currency.foreign,
        ui::format_money(quote.rate, &currency.local)
    );
    let source = match quote.as_of {
        Some(as_of) => format!("{} rate, {}", quote.origin, describe_age(as_of, now)),
        None => format!("{} rate", quote.origin),
    };
    let source_style = if quote.origin == RateOrigin::Fallback {
        ui::StyleType::Error
    } else {
        ui::StyleType::Subtle
    };

    format!(
        "{}\n{}",
        ui::style_text(&headline, ui::StyleType::TotalValue),
        ui::style_text(&source, source_style)
    )
}

pub fn render_conversion(
    amount: f64,
    rate: f64,
    direction: Direction,
    currency: &CurrencyConfig,
) -> String {
    let (from, to) = match direction {
        Direction::ToForeign => (&currency.local, &currency.foreign),
        Direction::ToLocal => (&currency.foreign, &currency.local),
    };
    let converted = convert::convert(amount, rate, direction);
    format!(
        "{} = {}",
        ui::format_money(amount, from),
        ui::style_text(&ui::format_money(converted, to), ui::StyleType::TotalValue)
    )
}

pub async fn run(app: &App) -> Result<()> {
    let quote = fetch_quote(&app.rates).await;
    println!("{}", render_quote(&quote, &app.config.currency, Utc::now()));
    Ok(())
}

pub async fn run_convert(app: &App, amount: f64, direction: Direction) -> Result<()> {
    if !amount.is_finite() {
        bail!("Invalid amount: {amount}");
    }
    let quote = fetch_quote(&app.rates).await;
    println!(
        "{}",
        render_conversion(amount, quote.rate, direction, &app.config.currency)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_describe_age() {
        let now = Utc::now();
        assert_eq!(describe_age(now, now), "just now");
        assert_eq!(describe_age(now - Duration::minutes(42), now), "42 min ago");
        assert_eq!(describe_age(now - Duration::hours(5), now), "5 h ago");
        assert_eq!(describe_age(now - Duration::days(3), now), "3 days ago");
    }

    #[test]
    fn test_render_fallback_quote() {
        console::set_colors_enabled(false);
        let output = render_quote(
            &RateQuote::fallback(117.5),
            &CurrencyConfig::default(),
            Utc::now(),
        );
        assert_eq!(output, "1 EUR = 117.50 RSD\nbuilt-in fallback rate");
    }

    #[test]
    fn test_render_conversion() {
        console::set_colors_enabled(false);
        let currency = CurrencyConfig::default();
        assert_eq!(
            render_conversion(1175.0, 117.5, Direction::ToForeign, &currency),
            "1175.00 RSD = 10.00 EUR"
        );
        assert_eq!(
            render_conversion(10.0, 117.5, Direction::ToLocal, &currency),
            "10.00 EUR = 1175.00 RSD"
        );
    }
}
