use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCurrency {
    pub code: String,
    pub symbol: Option<String>,
}

const SYMBOLS: &[(&str, &str)] = &[
    ("EUR", "€"),
    ("USD", "$"),
    ("GBP", "£"),
    ("XOF", "FCFA"),
    ("XAF", "FCFA"),
    ("NGN", "₦"),
    ("GHS", "GH₵"),
    ("KES", "KSh"),
    ("MAD", "DH"),
    ("CHF", "CHF"),
];

const COUNTRIES: &[(&str, &str)] = &[
    ("FR", "EUR"),
    ("DE", "EUR"),
    ("ES", "EUR"),
    ("IT", "EUR"),
    ("BE", "EUR"),
    ("NL", "EUR"),
    ("PT", "EUR"),
    ("LU", "EUR"),
    ("US", "USD"),
    ("GB", "GBP"),
    ("CH", "CHF"),
    ("SN", "XOF"),
    ("CI", "XOF"),
    ("ML", "XOF"),
    ("BF", "XOF"),
    ("BJ", "XOF"),
    ("TG", "XOF"),
    ("NE", "XOF"),
    ("CM", "XAF"),
    ("GA", "XAF"),
    ("CG", "XAF"),
    ("TD", "XAF"),
    ("CF", "XAF"),
    ("NG", "NGN"),
    ("GH", "GHS"),
    ("KE", "KES"),
    ("MA", "MAD"),
];

pub fn symbol_for_code(code: &str) -> Option<&'static str> {
    SYMBOLS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, s)| *s)
}

pub fn code_for_symbol(symbol: &str) -> Option<&'static str> {
    SYMBOLS
        .iter()
        .find(|(_, s)| s.eq_ignore_ascii_case(symbol))
        .map(|(c, _)| *c)
}

pub fn code_for_country(country: &str) -> Option<&'static str> {
    COUNTRIES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(country.trim()))
        .map(|(_, code)| *code)
}

fn from_code(code: &str) -> ResolvedCurrency {
    let code = code.trim().to_uppercase();
    ResolvedCurrency {
        symbol: symbol_for_code(&code).map(ToString::to_string),
        code,
    }
}

/// Resolves the request currency. An explicit ISO `currency_code` wins, then
/// `currency` (symbol or ISO code), then the destination country.
pub fn resolve(
    currency: Option<&str>,
    currency_code: Option<&str>,
    country: Option<&str>,
) -> Option<ResolvedCurrency> {
    if let Some(code) = currency_code.map(str::trim).filter(|c| !c.is_empty()) {
        return Some(from_code(code));
    }

    if let Some(raw) = currency.map(str::trim).filter(|c| !c.is_empty()) {
        if let Some(code) = code_for_symbol(raw) {
            return Some(ResolvedCurrency {
                code: code.to_string(),
                symbol: Some(raw.to_string()),
            });
        }
        if raw.len() == 3 && raw.chars().all(|c| c.is_ascii_alphabetic()) {
            return Some(from_code(raw));
        }
    }

    country.and_then(code_for_country).map(from_code)
}
