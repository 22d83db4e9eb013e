use super::{rates, ui};
use crate::core::{Exchange, ExchangeEvent, ExchangeView, Side};
use anyhow::{Result, bail};
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Prices and commits a single conversion.
pub async fn run(exchange: &Exchange, sell: &str, receive: &str, amount: &str) -> Result<()> {
    let mut events = exchange.subscribe();
    rates::refresh_with_spinner(exchange).await;

    exchange.select_currency(Side::Sell, sell)?;
    exchange.select_currency(Side::Receive, receive)?;
    exchange.update_sell_amount(amount)?;

    let view = exchange.snapshot();
    println!("{}", view.preview_as_table());

    if exchange.submit()?.is_none() {
        let problem = last_preview_problem(&mut events);
        bail!("Conversion not possible: {}", blocked_reason(&view, problem));
    }
    if let Some(result) = exchange.take_result() {
        println!(
            "\n{}\n",
            ui::style_text(&result.to_string(), ui::StyleType::TotalValue)
        );
    }
    println!("{}", exchange.snapshot().balances_as_table());
    Ok(())
}

/// Drains queued events and returns the latest reason a preview failed.
pub(crate) fn last_preview_problem(
    events: &mut broadcast::Receiver<ExchangeEvent>,
) -> Option<String> {
    let mut problem = None;
    loop {
        match events.try_recv() {
            Ok(ExchangeEvent::PreviewUnavailable { reason }) => problem = Some(reason),
            Ok(ExchangeEvent::PreviewUpdated(_) | ExchangeEvent::AmountsCleared) => {
                problem = None
            }
            Ok(_) | Err(TryRecvError::Lagged(_)) => {}
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    problem
}

/// Explains why the current view cannot be submitted.
pub(crate) fn blocked_reason(view: &ExchangeView, problem: Option<String>) -> String {
    if let Some(problem) = problem {
        return problem;
    }
    if !view.rates_loaded {
        "exchange rates are unavailable".to_string()
    } else if view.selection.sell_amount.is_none() {
        "no amount entered".to_string()
    } else if view.preview.as_ref().is_some_and(|p| !p.affordable) {
        format!("insufficient {} balance", view.selection.sell_currency)
    } else {
        format!("no {} balance to sell", view.selection.sell_currency)
    }
}
