use crate::currency::ResolvedCurrency;
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct LimitTable {
    entries: HashMap<String, Decimal>,
}

impl LimitTable {
    pub fn from_pairs(pairs: &[(&str, i64)]) -> Self {
        Self {
            entries: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Decimal::from(*v)))
                .collect(),
        }
    }

    pub fn lookup(&self, currency: &ResolvedCurrency) -> Option<Decimal> {
        currency
            .symbol
            .as_ref()
            .and_then(|s| self.entries.get(s))
            .or_else(|| self.entries.get(&currency.code))
            .copied()
    }
}
