use crate::currency::ResolvedCurrency;
use crate::domain::payment::PaymentAction;
use rust_decimal::Decimal;
use std::collections::HashSet;

pub mod limits;

pub use limits::LimitTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Stripe,
    Paypal,
    BankTransfer,
    MobileMoney,
    Wallet,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::Stripe,
        Provider::Paypal,
        Provider::BankTransfer,
        Provider::MobileMoney,
        Provider::Wallet,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Provider::Stripe => "stripe",
            Provider::Paypal => "paypal",
            Provider::BankTransfer => "bank_transfer",
            Provider::MobileMoney => "mobile_money",
            Provider::Wallet => "wallet",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Stripe => "Stripe",
            Provider::Paypal => "PayPal",
            Provider::BankTransfer => "Bank transfer",
            Provider::MobileMoney => "Mobile money",
            Provider::Wallet => "Wallet",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSelector {
    Supported(Provider),
    Unsupported(String),
}

impl ProviderSelector {
    pub fn parse(raw: &str) -> Self {
        let key = raw.trim().to_lowercase().replace('-', "_");
        match key.as_str() {
            "stripe" | "card" => ProviderSelector::Supported(Provider::Stripe),
            "paypal" => ProviderSelector::Supported(Provider::Paypal),
            "bank_transfer" | "bank" | "sepa" => ProviderSelector::Supported(Provider::BankTransfer),
            "mobile_money" | "momo" => ProviderSelector::Supported(Provider::MobileMoney),
            "wallet" | "internal" => ProviderSelector::Supported(Provider::Wallet),
            _ => ProviderSelector::Unsupported(raw.trim().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderRoute {
    Pay,
    Transactions,
}

#[derive(Debug, Clone)]
pub struct ProviderPolicy {
    pub provider: Provider,
    pub base_url: String,
    pub route: ProviderRoute,
    pub allowed_currencies: Option<HashSet<String>>,
    pub transaction_limits: LimitTable,
    pub daily_limits: LimitTable,
}

impl ProviderPolicy {
    pub fn url(&self, action: PaymentAction) -> String {
        let base = self.base_url.trim_end_matches('/');
        match (self.route, action) {
            (ProviderRoute::Pay, PaymentAction::Initiate) => format!("{}/pay", base),
            (_, action) => format!("{}/transactions/{}", base, action.as_str()),
        }
    }

    pub fn accepts_currency(&self, currency: &ResolvedCurrency) -> bool {
        match &self.allowed_currencies {
            None => true,
            Some(allowed) => {
                currency.symbol.as_ref().is_some_and(|s| allowed.contains(s)) || allowed.contains(&currency.code)
            }
        }
    }

    pub fn transaction_limit(&self, currency: &ResolvedCurrency) -> Option<Decimal> {
        self.transaction_limits.lookup(currency)
    }

    pub fn daily_limit(&self, currency: &ResolvedCurrency) -> Option<Decimal> {
        self.daily_limits.lookup(currency)
    }
}

#[derive(Debug, Clone)]
pub struct ProviderUrls {
    pub stripe: String,
    pub paypal: String,
    pub bank_transfer: String,
    pub mobile_money: String,
    pub wallet: String,
}

impl ProviderUrls {
    pub fn uniform(base: &str) -> Self {
        Self {
            stripe: base.to_string(),
            paypal: base.to_string(),
            bank_transfer: base.to_string(),
            mobile_money: base.to_string(),
            wallet: base.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    pub stripe: ProviderPolicy,
    pub paypal: ProviderPolicy,
    pub bank_transfer: ProviderPolicy,
    pub mobile_money: ProviderPolicy,
    pub wallet: ProviderPolicy,
}

impl ProviderRegistry {
    pub fn with_defaults(urls: ProviderUrls) -> Self {
        Self {
            stripe: ProviderPolicy {
                provider: Provider::Stripe,
                base_url: urls.stripe,
                route: ProviderRoute::Transactions,
                allowed_currencies: Some(["€", "$", "£"].iter().map(ToString::to_string).collect()),
                transaction_limits: LimitTable::from_pairs(&[("€", 5_000), ("$", 5_000), ("£", 4_000)]),
                daily_limits: LimitTable::from_pairs(&[("€", 5_000), ("$", 5_000), ("£", 4_000)]),
            },
            paypal: ProviderPolicy {
                provider: Provider::Paypal,
                base_url: urls.paypal,
                route: ProviderRoute::Transactions,
                allowed_currencies: None,
                transaction_limits: LimitTable::from_pairs(&[("€", 3_000), ("$", 3_000), ("GBP", 2_500)]),
                daily_limits: LimitTable::from_pairs(&[("€", 6_000), ("$", 6_000), ("GBP", 5_000)]),
            },
            bank_transfer: ProviderPolicy {
                provider: Provider::BankTransfer,
                base_url: urls.bank_transfer,
                route: ProviderRoute::Transactions,
                allowed_currencies: None,
                transaction_limits: LimitTable::from_pairs(&[("€", 15_000), ("CHF", 15_000), ("GBP", 12_000)]),
                daily_limits: LimitTable::from_pairs(&[("€", 15_000), ("CHF", 15_000), ("GBP", 12_000)]),
            },
            mobile_money: ProviderPolicy {
                provider: Provider::MobileMoney,
                base_url: urls.mobile_money,
                route: ProviderRoute::Transactions,
                allowed_currencies: None,
                transaction_limits: LimitTable::from_pairs(&[
                    ("FCFA", 1_000_000),
                    ("XAF", 1_000_000),
                    ("GHS", 10_000),
                    ("KES", 150_000),
                ]),
                daily_limits: LimitTable::from_pairs(&[
                    ("FCFA", 2_000_000),
                    ("XAF", 2_000_000),
                    ("GHS", 20_000),
                    ("KES", 300_000),
                ]),
            },
            wallet: ProviderPolicy {
                provider: Provider::Wallet,
                base_url: urls.wallet,
                route: ProviderRoute::Pay,
                allowed_currencies: None,
                transaction_limits: LimitTable::from_pairs(&[("€", 2_000), ("FCFA", 1_000_000)]),
                daily_limits: LimitTable::from_pairs(&[("€", 5_000), ("FCFA", 2_500_000)]),
            },
        }
    }

    pub fn policy(&self, provider: Provider) -> &ProviderPolicy {
        match provider {
            Provider::Stripe => &self.stripe,
            Provider::Paypal => &self.paypal,
            Provider::BankTransfer => &self.bank_transfer,
            Provider::MobileMoney => &self.mobile_money,
            Provider::Wallet => &self.wallet,
        }
    }
}
