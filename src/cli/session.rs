use super::convert::{blocked_reason, last_preview_problem};
use super::{rates, ui};
use crate::core::{Exchange, Side};
use anyhow::{Result, anyhow};
use std::io::Write;
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const HELP: &str = "\
Commands:
  sell <CUR>       choose the currency to sell
  receive <CUR>    choose the currency to receive
  amount [VALUE]   enter the amount to sell (empty clears it)
  submit           convert the previewed amount
  refresh          fetch the latest exchange rates
  rates            show the exchange rates
  balances         show balances and free conversions
  help             show this help
  quit             leave the session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Select(Side, String),
    Amount(String),
    Submit,
    Refresh,
    Rates,
    Balances,
    Help,
    Quit,
}

impl FromStr for SessionCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));

        let command = match word.to_ascii_lowercase().as_str() {
            "sell" | "receive" if rest.is_empty() => {
                return Err(anyhow!("'{word}' needs a currency code"));
            }
            "sell" => SessionCommand::Select(Side::Sell, rest.to_string()),
            "receive" => SessionCommand::Select(Side::Receive, rest.to_string()),
            "amount" => SessionCommand::Amount(rest.to_string()),
            "submit" => SessionCommand::Submit,
            "refresh" => SessionCommand::Refresh,
            "rates" => SessionCommand::Rates,
            "balances" => SessionCommand::Balances,
            "help" | "?" => SessionCommand::Help,
            "quit" | "exit" => SessionCommand::Quit,
            other => return Err(anyhow!("Unknown command '{other}', try 'help'")),
        };
        Ok(command)
    }
}

/// Runs the interactive exchange screen on stdin until `quit` or end of input.
pub async fn run(exchange: &Exchange) -> Result<()> {
    let mut events = exchange.subscribe();
    rates::refresh_with_spinner(exchange).await;

    println!("{}\n", exchange.snapshot().balances_as_table());
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n{} ", ui::style_text(">", ui::StyleType::TotalLabel));
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<SessionCommand>() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
                continue;
            }
        };
        debug!(?command, "Session command");

        match command {
            SessionCommand::Select(side, code) => {
                report(exchange.select_currency(side, &code));
                print_preview(exchange);
            }
            SessionCommand::Amount(text) => {
                report(exchange.update_sell_amount(&text));
                print_preview(exchange);
            }
            SessionCommand::Submit => match exchange.submit() {
                Ok(Some(_)) => {
                    if let Some(result) = exchange.take_result() {
                        println!(
                            "{}\n",
                            ui::style_text(&result.to_string(), ui::StyleType::TotalValue)
                        );
                    }
                    println!("{}", exchange.snapshot().balances_as_table());
                }
                Ok(None) => {
                    let problem = last_preview_problem(&mut events);
                    let reason = blocked_reason(&exchange.snapshot(), problem);
                    eprintln!(
                        "{}",
                        ui::style_text(
                            &format!("Nothing converted: {reason}"),
                            ui::StyleType::Error
                        )
                    );
                }
                Err(e) => report::<()>(Err(e)),
            },
            SessionCommand::Refresh => {
                rates::refresh_with_spinner(exchange).await;
                print_preview(exchange);
            }
            SessionCommand::Rates => match exchange.rates() {
                Some(snapshot) => println!(
                    "{}",
                    rates::rates_as_table(&snapshot, &exchange.snapshot().currencies)
                ),
                None => eprintln!(
                    "{}",
                    ui::style_text("No exchange rates loaded yet", ui::StyleType::Error)
                ),
            },
            SessionCommand::Balances => {
                println!("{}", exchange.snapshot().balances_as_table());
            }
            SessionCommand::Help => println!("{HELP}"),
            SessionCommand::Quit => break,
        }
    }
    Ok(())
}

fn print_preview(exchange: &Exchange) {
    println!("{}", exchange.snapshot().preview_as_table());
}

fn report<T>(result: crate::core::ExchangeResult<T>) {
    if let Err(e) = result {
        eprintln!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
    }
}
