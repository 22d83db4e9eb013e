//! The exchange orchestrator.
//!
//! [`Exchange`] owns the latest rate snapshot, the user's selection and the
//! balances. Every mutation goes through one mutex; events are published on a
//! broadcast channel while that mutex is held, after the state they describe
//! has been applied.
use crate::core::balance::{Balance, BalanceStore, find_balance};
use crate::core::conversion::{self, ConversionRequest, DEFAULT_COMMISSION_PERCENT, Preview};
use crate::core::currency::{Currency, CurrencyRegistry, RateSnapshot, RateSource};
use crate::core::error::{ExchangeError, ExchangeResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Sell,
    Receive,
}

impl Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Sell => f.write_str("sell"),
            Side::Receive => f.write_str("receive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeSelection {
    pub sell_currency: Currency,
    pub receive_currency: Currency,
    /// `None` while the amount field is empty.
    pub sell_amount: Option<Decimal>,
    pub commission_percent: Decimal,
    pub free_conversions: u32,
}

/// Outcome of the last committed conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub sell_label: String,
    pub receive_label: String,
    pub commission_value: Decimal,
    pub commission_currency: Currency,
}

impl Display for ConversionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "You have converted {} to {}. Commission Fee - {:.2} {}.",
            self.sell_label, self.receive_label, self.commission_value, self.commission_currency
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The fetched snapshot replaced the previous one.
    Applied,
    /// A newer refresh was issued while this one was in flight.
    Discarded,
    /// The fetch failed; the previous snapshot (if any) is still in use.
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeEvent {
    RatesUpdated { base: Currency, currencies: usize },
    RatesUnavailable { reason: String },
    SelectionChanged { side: Side, currency: Currency },
    PreviewUpdated(Preview),
    PreviewUnavailable { reason: String },
    AmountsCleared,
    ConversionCommitted(ConversionResult),
}

/// Settings the orchestrator starts with.
#[derive(Debug, Clone)]
pub struct ExchangeSettings {
    pub currencies: CurrencyRegistry,
    pub sell_currency: Currency,
    pub receive_currency: Currency,
    pub commission_percent: Decimal,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            currencies: CurrencyRegistry::default(),
            sell_currency: Currency::eur(),
            receive_currency: Currency::usd(),
            commission_percent: DEFAULT_COMMISSION_PERCENT,
        }
    }
}

/// A consistent copy of everything a front-end shows.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeView {
    pub balances: Vec<Balance>,
    pub selection: ExchangeSelection,
    pub receive_amount: Decimal,
    pub preview: Option<Preview>,
    pub submit_enabled: bool,
    pub rates_loaded: bool,
    pub currencies: Vec<Currency>,
}

struct ExchangeState {
    rates: Option<Arc<RateSnapshot>>,
    selection: ExchangeSelection,
    balances: Vec<Balance>,
    preview: Option<Preview>,
    receive_amount: Decimal,
    last_result: Option<ConversionResult>,
    /// Last refresh issued.
    refresh_seq: u64,
    /// Refresh whose snapshot is currently held.
    applied_seq: u64,
}

impl ExchangeState {
    fn submit_enabled(&self) -> bool {
        self.preview.as_ref().is_some_and(|p| p.affordable)
    }

    fn clear_amounts(&mut self) {
        self.selection.sell_amount = None;
        self.preview = None;
        self.receive_amount = Decimal::ZERO;
    }

    /// Recomputes the preview for the current amount. Failures leave no
    /// preview and are reported as the error string.
    fn recompute(&mut self) -> Result<Option<Preview>, String> {
        self.preview = None;
        self.receive_amount = Decimal::ZERO;

        let Some(amount) = self.selection.sell_amount else {
            return Ok(None);
        };
        let Some(rates) = self.rates.as_ref() else {
            return Err("no exchange rates loaded".to_string());
        };
        let Some(sell_balance) = find_balance(&self.balances, &self.selection.sell_currency)
        else {
            return Err(format!(
                "no {} balance to sell from",
                self.selection.sell_currency
            ));
        };

        let request = ConversionRequest {
            sell_currency: self.selection.sell_currency.clone(),
            receive_currency: self.selection.receive_currency.clone(),
            sell_amount: amount,
            sell_balance: sell_balance.amount,
            free_conversions: self.selection.free_conversions,
            commission_percent: self.selection.commission_percent,
        };
        let preview = conversion::preview(rates, &request).map_err(|e| e.to_string())?;
        self.receive_amount = preview.receive_amount;
        self.preview = Some(preview.clone());
        Ok(Some(preview))
    }
}

pub struct Exchange {
    currencies: CurrencyRegistry,
    rate_source: Arc<dyn RateSource>,
    store: Arc<dyn BalanceStore>,
    state: Mutex<ExchangeState>,
    events: broadcast::Sender<ExchangeEvent>,
}

impl Exchange {
    /// Loads balances and the free conversion counter from `store`.
    pub fn new(
        settings: ExchangeSettings,
        rate_source: Arc<dyn RateSource>,
        store: Arc<dyn BalanceStore>,
    ) -> ExchangeResult<Self> {
        for currency in [&settings.sell_currency, &settings.receive_currency] {
            if !settings.currencies.contains(currency) {
                return Err(ExchangeError::InvalidSelection(format!(
                    "{currency} is not a supported currency"
                )));
            }
        }

        let balances = store.get_balances().map_err(ExchangeError::Store)?;
        let free_conversions = store.get_free_conversions().map_err(ExchangeError::Store)?;
        if find_balance(&balances, &settings.sell_currency).is_none() {
            warn!(
                currency = %settings.sell_currency,
                "No balance held in the default sell currency"
            );
        }
        debug!(?balances, free_conversions, "Loaded user data");

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            currencies: settings.currencies,
            rate_source,
            store,
            state: Mutex::new(ExchangeState {
                rates: None,
                selection: ExchangeSelection {
                    sell_currency: settings.sell_currency,
                    receive_currency: settings.receive_currency,
                    sell_amount: None,
                    commission_percent: settings.commission_percent,
                    free_conversions,
                },
                balances,
                preview: None,
                receive_amount: Decimal::ZERO,
                last_result: None,
                refresh_seq: 0,
                applied_seq: 0,
            }),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExchangeEvent> {
        self.events.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, ExchangeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ExchangeEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn emit_preview(&self, outcome: Result<Option<Preview>, String>) {
        match outcome {
            Ok(Some(preview)) => self.emit(ExchangeEvent::PreviewUpdated(preview)),
            Ok(None) => self.emit(ExchangeEvent::AmountsCleared),
            Err(reason) => {
                debug!(%reason, "Preview unavailable");
                self.emit(ExchangeEvent::PreviewUnavailable { reason });
            }
        }
    }

    /// Fetches a new rate snapshot. Failures are logged and keep the previous
    /// snapshot in place. A reply older than the snapshot already held is
    /// discarded.
    #[instrument(name = "RefreshRates", skip(self))]
    pub async fn refresh_rates(&self) -> RefreshOutcome {
        let seq = {
            let mut state = self.lock();
            state.refresh_seq += 1;
            state.refresh_seq
        };

        let fetched = self.rate_source.fetch_rates().await;

        let mut state = self.lock();
        if state.applied_seq > seq {
            debug!(seq, applied = state.applied_seq, "Discarding superseded rate reply");
            return RefreshOutcome::Discarded;
        }

        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Failed to refresh exchange rates");
                self.emit(ExchangeEvent::RatesUnavailable {
                    reason: e.to_string(),
                });
                return RefreshOutcome::Failed;
            }
        };

        for currency in [
            &state.selection.sell_currency,
            &state.selection.receive_currency,
        ] {
            if !snapshot.has_rate(currency) {
                warn!(%currency, "Fetched rates do not cover the selected currency");
            }
        }
        info!(
            base = %snapshot.base,
            currencies = snapshot.rates.len(),
            "Exchange rates updated"
        );
        let event = ExchangeEvent::RatesUpdated {
            base: snapshot.base.clone(),
            currencies: snapshot.rates.len(),
        };
        state.rates = Some(Arc::new(snapshot));
        state.applied_seq = seq;
        self.emit(event);

        // Whatever was entered while the request was in flight is priced
        // against the snapshot now held.
        if state.selection.sell_amount.is_some() {
            let outcome = state.recompute();
            self.emit_preview(outcome);
        }
        RefreshOutcome::Applied
    }

    /// Picks the sell or receive currency and clears any entered amount.
    pub fn select_currency(&self, side: Side, code: &str) -> ExchangeResult<()> {
        let currency = self.currencies.resolve(code)?;

        let mut state = self.lock();
        match side {
            Side::Sell => state.selection.sell_currency = currency.clone(),
            Side::Receive => state.selection.receive_currency = currency.clone(),
        }
        state.clear_amounts();
        debug!(%side, %currency, "Currency selected");

        self.emit(ExchangeEvent::SelectionChanged { side, currency });
        self.emit(ExchangeEvent::AmountsCleared);
        Ok(())
    }

    /// Stores the typed sell amount and refreshes the preview. Rejected input
    /// leaves the previous amount untouched.
    pub fn update_sell_amount(&self, text: &str) -> ExchangeResult<()> {
        let amount = conversion::parse_amount(text)?;

        let mut state = self.lock();
        state.selection.sell_amount = amount;
        let outcome = state.recompute();
        self.emit_preview(outcome);
        Ok(())
    }

    /// Commits the previewed conversion. Returns `Ok(None)` without touching
    /// anything when there is no affordable preview.
    pub fn submit(&self) -> ExchangeResult<Option<ConversionResult>> {
        let mut state = self.lock();

        let (Some(preview), Some(amount)) = (state.preview.clone(), state.selection.sell_amount)
        else {
            debug!("Submit ignored: nothing to convert");
            return Ok(None);
        };
        if !preview.affordable {
            debug!(remainder = %preview.remainder, "Submit ignored: insufficient funds");
            return Ok(None);
        }

        let sell_currency = state.selection.sell_currency.clone();
        let receive_currency = state.selection.receive_currency.clone();
        if find_balance(&state.balances, &sell_currency).is_none() {
            debug!(currency = %sell_currency, "Submit ignored: no sell balance");
            return Ok(None);
        }

        let mut updated = state.balances.clone();
        if find_balance(&updated, &receive_currency).is_none() {
            updated.push(Balance::zero(receive_currency.clone()));
        }
        for balance in updated.iter_mut() {
            if balance.currency == sell_currency {
                balance.amount = preview.remainder;
            } else if balance.currency == receive_currency {
                let credited = balance
                    .amount
                    .checked_add(preview.receive_amount)
                    .ok_or_else(|| {
                        ExchangeError::validation(amount.to_string(), "amount is too large")
                    })?;
                balance.amount = conversion::round_up(credited);
            }
        }

        let free_conversions = self
            .store
            .commit_conversion(&updated)
            .map_err(ExchangeError::Store)?;

        state.balances = match self.store.get_balances() {
            Ok(balances) => balances,
            Err(e) => {
                warn!(error = %e, "Failed to reload balances after commit");
                updated
            }
        };
        state.selection.free_conversions = free_conversions;

        let result = ConversionResult {
            sell_label: format!("{:.2} {}", amount, sell_currency),
            receive_label: format!("{:.2} {}", preview.receive_amount, receive_currency),
            commission_value: preview.commission,
            commission_currency: sell_currency,
        };
        info!(%result, free_conversions, "Conversion committed");
        state.last_result = Some(result.clone());
        state.clear_amounts();

        self.emit(ExchangeEvent::ConversionCommitted(result.clone()));
        self.emit(ExchangeEvent::AmountsCleared);
        Ok(Some(result))
    }

    /// Returns the last conversion result once.
    pub fn take_result(&self) -> Option<ConversionResult> {
        self.lock().last_result.take()
    }

    pub fn rates(&self) -> Option<Arc<RateSnapshot>> {
        self.lock().rates.clone()
    }

    pub fn snapshot(&self) -> ExchangeView {
        let state = self.lock();
        ExchangeView {
            balances: state.balances.clone(),
            selection: state.selection.clone(),
            receive_amount: state.receive_amount,
            preview: state.preview.clone(),
            submit_enabled: state.submit_enabled(),
            rates_loaded: state.rates.is_some(),
            currencies: self.currencies.iter().cloned().collect(),
        }
    }
}
