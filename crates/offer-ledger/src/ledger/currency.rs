//! Conversion between the base currency and display currencies.
//!
//! The engine stores and computes every amount in base currency. Conversion happens only
//! when reading for display, so a failed rate fetch degrades to the last known or static
//! rate table instead of failing the read.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::RwLock;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CurrencyError {
    #[error("no exchange rate known for {0}")]
    UnknownCurrency(String),
    #[error("invalid exchange rate for {currency}: '{raw}'")]
    InvalidRate { currency: String, raw: String },
    #[error("exchange rate source unavailable: {0}")]
    Source(String),
}

pub trait CurrencyNormalizer: Send + Sync {
    fn base_currency(&self) -> &str;

    fn convert_to_base(&self, amount: Decimal, currency: &str) -> Result<Decimal, CurrencyError>;

    fn convert_from_base(
        &self,
        amount: Decimal,
        target_currency: &str,
    ) -> Result<Decimal, CurrencyError>;
}

/// Units of each currency per one unit of base currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateTable {
    base: String,
    rates: BTreeMap<String, Decimal>,
}

impl RateTable {
    pub fn new(base: &str) -> Self {
        Self {
            base: normalize_code(base),
            rates: BTreeMap::new(),
        }
    }

    pub fn with_rate(mut self, currency: &str, rate: Decimal) -> Result<Self, CurrencyError> {
        self.insert(currency, rate)?;
        Ok(self)
    }

    pub fn insert(&mut self, currency: &str, rate: Decimal) -> Result<(), CurrencyError> {
        if rate <= Decimal::ZERO {
            return Err(CurrencyError::InvalidRate {
                currency: normalize_code(currency),
                raw: rate.to_string(),
            });
        }
        self.rates.insert(normalize_code(currency), rate);
        Ok(())
    }

    /// Parses `EUR=0.92,GBP=0.79` style lists. Blank input yields an empty table.
    pub fn parse(base: &str, raw: &str) -> Result<Self, CurrencyError> {
        let mut table = Self::new(base);
        for pair in raw.split(',').map(str::trim).filter(|pair| !pair.is_empty()) {
            let (currency, value) = pair.split_once('=').ok_or_else(|| CurrencyError::InvalidRate {
                currency: pair.to_string(),
                raw: String::new(),
            })?;
            let rate = Decimal::from_str(value.trim()).map_err(|_| CurrencyError::InvalidRate {
                currency: normalize_code(currency),
                raw: value.trim().to_string(),
            })?;
            table.insert(currency, rate)?;
        }
        Ok(table)
    }

    pub fn rate(&self, currency: &str) -> Option<Decimal> {
        let code = normalize_code(currency);
        if code == self.base {
            return Some(Decimal::ONE);
        }
        self.rates.get(&code).copied()
    }

    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }

    fn require_rate(&self, currency: &str) -> Result<Decimal, CurrencyError> {
        self.rate(currency)
            .ok_or_else(|| CurrencyError::UnknownCurrency(normalize_code(currency)))
    }
}

impl CurrencyNormalizer for RateTable {
    fn base_currency(&self) -> &str {
        &self.base
    }

    fn convert_to_base(&self, amount: Decimal, currency: &str) -> Result<Decimal, CurrencyError> {
        Ok(amount / self.require_rate(currency)?)
    }

    fn convert_from_base(
        &self,
        amount: Decimal,
        target_currency: &str,
    ) -> Result<Decimal, CurrencyError> {
        Ok(amount * self.require_rate(target_currency)?)
    }
}

/// Remote exchange-rate provider.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rates(&self, base: &str) -> Result<BTreeMap<String, Decimal>, CurrencyError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateRefresh {
    Live,
    Fallback,
}

/// Normalizer backed by a live source with a static table behind it.
pub struct FallbackNormalizer<S> {
    source: S,
    fallback: RateTable,
    current: RwLock<RateTable>,
}

impl<S> FallbackNormalizer<S>
where
    S: RateSource,
{
    pub fn new(source: S, fallback: RateTable) -> Self {
        Self {
            source,
            current: RwLock::new(fallback.clone()),
            fallback,
        }
    }

    /// Pulls fresh rates. On failure the previously loaded table stays in effect.
    pub async fn refresh(&self) -> RateRefresh {
        let base = self.fallback.base_currency().to_string();
        let fetched = match self.source.fetch_rates(&base).await {
            Ok(rates) => rates,
            Err(err) => {
                warn!(error = %err, base = %base, "exchange rate refresh failed, keeping cached rates");
                return RateRefresh::Fallback;
            }
        };

        let mut table = RateTable::new(&base);
        for (currency, rate) in fetched {
            if let Err(err) = table.insert(&currency, rate) {
                warn!(error = %err, "ignoring invalid exchange rate");
            }
        }

        match self.current.write() {
            Ok(mut current) => {
                info!(base = %base, currencies = table.rates.len(), "exchange rates refreshed");
                *current = table;
                RateRefresh::Live
            }
            Err(_) => RateRefresh::Fallback,
        }
    }

    fn lookup(&self, currency: &str) -> Result<Decimal, CurrencyError> {
        let live = self
            .current
            .read()
            .ok()
            .and_then(|table| table.rate(currency));
        live.or_else(|| self.fallback.rate(currency))
            .ok_or_else(|| CurrencyError::UnknownCurrency(normalize_code(currency)))
    }
}

impl<S> CurrencyNormalizer for FallbackNormalizer<S>
where
    S: RateSource,
{
    fn base_currency(&self) -> &str {
        self.fallback.base_currency()
    }

    fn convert_to_base(&self, amount: Decimal, currency: &str) -> Result<Decimal, CurrencyError> {
        Ok(amount / self.lookup(currency)?)
    }

    fn convert_from_base(
        &self,
        amount: Decimal,
        target_currency: &str,
    ) -> Result<Decimal, CurrencyError> {
        Ok(amount * self.lookup(target_currency)?)
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
