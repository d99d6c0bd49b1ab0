//! The tracked coin universe.
//!
//! Every persisted table and every scheduled job is keyed by a [`TrackedSymbol`].
//! The set actually served by a process is a [`SymbolRegistry`], validated once at
//! startup against the configured symbol list.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::MarketError;

const QUOTE_ASSET: &str = "USDT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrackedSymbol {
    Btc,
    Eth,
    Bnb,
    Sol,
    Xrp,
    Ton,
    Ada,
    Doge,
    Avax,
    Link,
    Dot,
    Matic,
    Icp,
    Ltc,
    Shib,
    Bch,
    Uni,
    Apt,
    Near,
    Xlm,
}

impl TrackedSymbol {
    pub const ALL: [TrackedSymbol; 20] = [
        TrackedSymbol::Btc,
        TrackedSymbol::Eth,
        TrackedSymbol::Bnb,
        TrackedSymbol::Sol,
        TrackedSymbol::Xrp,
        TrackedSymbol::Ton,
        TrackedSymbol::Ada,
        TrackedSymbol::Doge,
        TrackedSymbol::Avax,
        TrackedSymbol::Link,
        TrackedSymbol::Dot,
        TrackedSymbol::Matic,
        TrackedSymbol::Icp,
        TrackedSymbol::Ltc,
        TrackedSymbol::Shib,
        TrackedSymbol::Bch,
        TrackedSymbol::Uni,
        TrackedSymbol::Apt,
        TrackedSymbol::Near,
        TrackedSymbol::Xlm,
    ];

    /// Base asset ticker, e.g. `BTC`.
    pub fn base(&self) -> &'static str {
        match self {
            TrackedSymbol::Btc => "BTC",
            TrackedSymbol::Eth => "ETH",
            TrackedSymbol::Bnb => "BNB",
            TrackedSymbol::Sol => "SOL",
            TrackedSymbol::Xrp => "XRP",
            TrackedSymbol::Ton => "TON",
            TrackedSymbol::Ada => "ADA",
            TrackedSymbol::Doge => "DOGE",
            TrackedSymbol::Avax => "AVAX",
            TrackedSymbol::Link => "LINK",
            TrackedSymbol::Dot => "DOT",
            TrackedSymbol::Matic => "MATIC",
            TrackedSymbol::Icp => "ICP",
            TrackedSymbol::Ltc => "LTC",
            TrackedSymbol::Shib => "SHIB",
            TrackedSymbol::Bch => "BCH",
            TrackedSymbol::Uni => "UNI",
            TrackedSymbol::Apt => "APT",
            TrackedSymbol::Near => "NEAR",
            TrackedSymbol::Xlm => "XLM",
        }
    }

    /// Binance trading pair, e.g. `BTCUSDT`.
    pub fn pair(&self) -> String {
        format!("{}{}", self.base(), QUOTE_ASSET)
    }

    pub fn quote(&self) -> &'static str {
        QUOTE_ASSET
    }

    /// CoinGecko coin id used for descriptions and percent changes.
    pub fn coingecko_id(&self) -> &'static str {
        match self {
            TrackedSymbol::Btc => "bitcoin",
            TrackedSymbol::Eth => "ethereum",
            TrackedSymbol::Bnb => "binancecoin",
            TrackedSymbol::Sol => "solana",
            TrackedSymbol::Xrp => "ripple",
            TrackedSymbol::Ton => "the-open-network",
            TrackedSymbol::Ada => "cardano",
            TrackedSymbol::Doge => "dogecoin",
            TrackedSymbol::Avax => "avalanche-2",
            TrackedSymbol::Link => "chainlink",
            TrackedSymbol::Dot => "polkadot",
            TrackedSymbol::Matic => "matic-network",
            TrackedSymbol::Icp => "internet-computer",
            TrackedSymbol::Ltc => "litecoin",
            TrackedSymbol::Shib => "shiba-inu",
            TrackedSymbol::Bch => "bitcoin-cash",
            TrackedSymbol::Uni => "uniswap",
            TrackedSymbol::Apt => "aptos",
            TrackedSymbol::Near => "near",
            TrackedSymbol::Xlm => "stellar",
        }
    }
}

impl fmt::Display for TrackedSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pair())
    }
}

impl FromStr for TrackedSymbol {
    type Err = MarketError;

    /// Accepts the pair (`BTCUSDT`) or the base asset (`btc`), case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        let base = upper.strip_suffix(QUOTE_ASSET).unwrap_or(&upper);
        TrackedSymbol::ALL
            .iter()
            .copied()
            .find(|sym| sym.base() == base)
            .ok_or_else(|| MarketError::UnsupportedSymbol(s.trim().to_string()))
    }
}

/// The symbols a process serves, in configuration order.
#[derive(Debug, Clone)]
pub struct SymbolRegistry {
    symbols: Vec<TrackedSymbol>,
}

impl SymbolRegistry {
    /// Validate a configured symbol list. Unknown or duplicate entries are startup errors.
    pub fn validate<S: AsRef<str>>(configured: &[S]) -> Result<Self, MarketError> {
        if configured.is_empty() {
            return Err(MarketError::Validation("symbol list is empty".to_string()));
        }

        let mut symbols = Vec::with_capacity(configured.len());
        for raw in configured {
            let sym: TrackedSymbol = raw.as_ref().parse()?;
            if symbols.contains(&sym) {
                return Err(MarketError::Validation(format!(
                    "symbol {} configured twice",
                    sym
                )));
            }
            symbols.push(sym);
        }

        Ok(Self { symbols })
    }

    /// Read `TRACKED_SYMBOLS` (comma separated); defaults to the full universe.
    pub fn from_env() -> Result<Self, MarketError> {
        match std::env::var("TRACKED_SYMBOLS") {
            Ok(raw) if !raw.trim().is_empty() => {
                let parts: Vec<&str> = raw.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
                Self::validate(&parts)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Resolve user input to a symbol that this registry serves.
    pub fn resolve(&self, raw: &str) -> Result<TrackedSymbol, MarketError> {
        let sym: TrackedSymbol = raw.parse()?;
        if self.symbols.contains(&sym) {
            Ok(sym)
        } else {
            Err(MarketError::UnsupportedSymbol(raw.trim().to_string()))
        }
    }

    pub fn symbols(&self) -> &[TrackedSymbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Default for SymbolRegistry {
    fn default() -> Self {
        Self {
            symbols: TrackedSymbol::ALL.to_vec(),
        }
    }
}
