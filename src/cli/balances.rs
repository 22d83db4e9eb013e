use super::ui;
use crate::core::{Exchange, ExchangeView};
use comfy_table::Cell;

impl ExchangeView {
    pub fn balances_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Currency"), ui::header_cell("Balance")]);

        for balance in &self.balances {
            table.add_row(vec![
                Cell::new(balance.currency.code()),
                ui::amount_cell(balance.amount),
            ]);
        }

        let mut output = format!("{}\n\n", ui::style_text("My balances", ui::StyleType::Title));
        output.push_str(&table.to_string());
        output.push_str(&format!(
            "\n\nFree conversions left: {}",
            ui::style_text(
                &self.selection.free_conversions.to_string(),
                ui::StyleType::TotalValue
            )
        ));
        output
    }

    pub fn preview_as_table(&self) -> String {
        let sell = &self.selection.sell_currency;
        let receive = &self.selection.receive_currency;

        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell(&format!("Sell ({sell})")),
            ui::header_cell(&format!("Receive ({receive})")),
            ui::header_cell(&format!("Commission ({sell})")),
            ui::header_cell(&format!("Remainder ({sell})")),
        ]);

        let sell_cell = self
            .selection
            .sell_amount
            .map_or_else(|| ui::na_cell(false), ui::amount_cell);
        match &self.preview {
            Some(preview) => table.add_row(vec![
                sell_cell,
                ui::amount_cell(preview.receive_amount),
                ui::amount_cell(preview.commission),
                ui::remainder_cell(preview.remainder),
            ]),
            None => {
                let has_error = self.selection.sell_amount.is_some();
                table.add_row(vec![
                    sell_cell,
                    ui::amount_cell(self.receive_amount),
                    ui::na_cell(has_error),
                    ui::na_cell(has_error),
                ])
            }
        };

        let status = if self.submit_enabled {
            ui::style_text("ready to submit", ui::StyleType::TotalValue)
        } else if !self.rates_loaded {
            ui::style_text("exchange rates unavailable", ui::StyleType::Error)
        } else if self.preview.is_some() {
            ui::style_text("insufficient funds", ui::StyleType::Error)
        } else {
            ui::style_text("enter an amount", ui::StyleType::Subtle)
        };

        format!("{table}\n{status}")
    }
}

pub fn run(exchange: &Exchange) {
    println!("{}", exchange.snapshot().balances_as_table());
}

#[cfg(test)]
mod tests {
    use crate::core::conversion::Preview;
    use crate::core::exchange::ExchangeSelection;
    use crate::core::{Balance, Currency, ExchangeView};
    use rust_decimal_macros::dec;

    fn view() -> ExchangeView {
        ExchangeView {
            balances: vec![
                Balance::new(Currency::eur(), dec!(900.00)),
                Balance::new(Currency::usd(), dec!(110.00)),
            ],
            selection: ExchangeSelection {
                sell_currency: Currency::eur(),
                receive_currency: Currency::usd(),
                sell_amount: Some(dec!(100.00)),
                commission_percent: dec!(0.7),
                free_conversions: 4,
            },
            receive_amount: dec!(110.00),
            preview: Some(Preview {
                commission: dec!(0.70),
                receive_amount: dec!(110.00),
                remainder: dec!(799.30),
                affordable: true,
            }),
            submit_enabled: true,
            rates_loaded: true,
            currencies: vec![Currency::eur(), Currency::usd()],
        }
    }

    #[test]
    fn test_balances_table_lists_every_currency() {
        let output = console::strip_ansi_codes(&view().balances_as_table()).to_string();
        assert!(output.contains("EUR"));
        assert!(output.contains("900.00"));
        assert!(output.contains("110.00"));
        assert!(output.contains("Free conversions left: 4"));
    }

    #[test]
    fn test_preview_table_without_rates() {
        let mut view = view();
        view.preview = None;
        view.submit_enabled = false;
        view.rates_loaded = false;
        view.receive_amount = dec!(0);

        let output = console::strip_ansi_codes(&view.preview_as_table()).to_string();
        assert!(output.contains("N/A"));
        assert!(output.contains("exchange rates unavailable"));
    }

    #[test]
    fn test_preview_table_ready() {
        let output = console::strip_ansi_codes(&view().preview_as_table()).to_string();
        assert!(output.contains("799.30"));
        assert!(output.contains("0.70"));
        assert!(output.contains("ready to submit"));
    }
}
