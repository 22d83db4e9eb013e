use super::ui;
use crate::core::{Currency, Exchange, RateSnapshot, RefreshOutcome};
use anyhow::{Result, bail};
use comfy_table::Cell;

/// Renders the rates of `currencies` against the snapshot base.
pub fn rates_as_table<'a>(
    snapshot: &RateSnapshot,
    currencies: impl IntoIterator<Item = &'a Currency>,
) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell(&format!("Rate (1 {})", snapshot.base)),
    ]);

    for currency in currencies {
        let rate_cell = match snapshot.rate(currency) {
            Ok(rate) => Cell::new(rate.normalize().to_string())
                .set_alignment(comfy_table::CellAlignment::Right),
            Err(_) => ui::na_cell(true),
        };
        table.add_row(vec![Cell::new(currency.code()), rate_cell]);
    }

    let as_of = snapshot
        .as_of
        .as_deref()
        .map(|d| format!(" as of {d}"))
        .unwrap_or_default();
    format!(
        "{}{}\n\n{}",
        ui::style_text("Exchange rates", ui::StyleType::Title),
        ui::style_text(&as_of, ui::StyleType::Subtle),
        table
    )
}

/// Fetches rates and prints them for every selectable currency.
pub async fn run(exchange: &Exchange) -> Result<()> {
    refresh_with_spinner(exchange).await;

    let Some(snapshot) = exchange.rates() else {
        bail!("Exchange rates are unavailable right now");
    };
    let view = exchange.snapshot();
    println!("{}", rates_as_table(&snapshot, &view.currencies));
    Ok(())
}

pub(crate) async fn refresh_with_spinner(exchange: &Exchange) -> RefreshOutcome {
    let spinner = ui::new_spinner("Fetching exchange rates...");
    let outcome = exchange.refresh_rates().await;
    spinner.finish_and_clear();

    if outcome == RefreshOutcome::Failed {
        eprintln!(
            "{}",
            ui::style_text(
                "Could not refresh exchange rates; using the last known rates if any.",
                ui::StyleType::Error
            )
        );
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[test]
    fn test_rates_table_marks_missing_rates() {
        let snapshot = RateSnapshot::new(
            Currency::eur(),
            HashMap::from([(Currency::usd(), dec!(1.129031))]),
        )
        .with_as_of(Some("2024-05-02".to_string()));
        let gbp: Currency = "GBP".parse().unwrap();

        let output = console::strip_ansi_codes(&rates_as_table(
            &snapshot,
            [&Currency::eur(), &Currency::usd(), &gbp],
        ))
        .to_string();

        assert!(output.contains("as of 2024-05-02"));
        assert!(output.contains("1.129031"));
        assert!(output.contains("Rate (1 EUR)"));
        assert!(output.contains("N/A"));
    }
}
