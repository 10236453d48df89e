//! Token Records and Market Snapshots
//!
//! Identity of a tracked token plus the append-only market observations
//! attached to it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Length in bytes of a decoded Solana mint address
pub const ADDRESS_BYTES: usize = 32;

/// Decimals assumed when a provider does not report them
pub const DEFAULT_DECIMALS: u8 = 9;

/// Store-assigned token identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub u64);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Market-data backend that produced a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Birdeye,
    DexScreener,
    Helius,
    Solscan,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::DexScreener,
        ProviderKind::Birdeye,
        ProviderKind::Solscan,
        ProviderKind::Helius,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Birdeye => "birdeye",
            ProviderKind::DexScreener => "dexscreener",
            ProviderKind::Helius => "helius",
            ProviderKind::Solscan => "solscan",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "birdeye" => Ok(ProviderKind::Birdeye),
            "dexscreener" => Ok(ProviderKind::DexScreener),
            "helius" => Ok(ProviderKind::Helius),
            "solscan" => Ok(ProviderKind::Solscan),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// Returns true if `address` is base58 and decodes to a 32-byte key
pub fn is_valid_address(address: &str) -> bool {
    match bs58::decode(address).into_vec() {
        Ok(bytes) => bytes.len() == ADDRESS_BYTES,
        Err(_) => false,
    }
}

/// Numeric market figures shared by snapshots and provider results
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketFigures {
    /// Price in USD
    pub price: f64,
    /// 24h price change in percent
    pub price_change_24h: f64,
    /// Market cap in USD
    pub market_cap: f64,
    /// 24h volume in USD
    pub volume_24h: f64,
    /// Liquidity in USD
    pub liquidity: f64,
    pub holder_count: u64,
    pub tx_count_24h: u64,
    /// Fully diluted value in USD
    pub fdv: f64,
}

impl MarketFigures {
    /// True when every numeric field is zero (typical of a provider outage)
    pub fn is_all_zero(&self) -> bool {
        self.price == 0.0
            && self.price_change_24h == 0.0
            && self.market_cap == 0.0
            && self.volume_24h == 0.0
            && self.liquidity == 0.0
            && self.holder_count == 0
            && self.tx_count_24h == 0
            && self.fdv == 0.0
    }

    /// True if the reading carries a usable price, market cap or liquidity
    pub fn has_valid_data(&self) -> bool {
        self.price > 0.0 || self.market_cap > 0.0 || self.liquidity > 0.0
    }

    /// Fill a zero price or market cap from an earlier reading
    pub fn carry_forward(mut self, prior: &MarketFigures) -> Self {
        if self.price == 0.0 && prior.price > 0.0 {
            self.price = prior.price;
        }
        if self.market_cap == 0.0 && prior.market_cap > 0.0 {
            self.market_cap = prior.market_cap;
        }
        self
    }
}

/// A tracked token, keyed by its chain address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub id: TokenId,
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn has_icon(&self) -> bool {
        self.icon.as_deref().map_or(false, |icon| !icon.is_empty())
    }

    /// Identity overwrite allowed for an incoming reading.
    ///
    /// Name and symbol are only replaced when the reading brings a non-empty
    /// icon and the record has none.
    pub fn identity_update(
        &self,
        name: &str,
        symbol: &str,
        icon: Option<&str>,
    ) -> Option<IdentityUpdate> {
        let icon = icon.filter(|i| !i.is_empty())?;
        if self.has_icon() {
            return None;
        }
        Some(IdentityUpdate {
            name: if name.is_empty() { self.name.clone() } else { name.to_string() },
            symbol: if symbol.is_empty() { self.symbol.clone() } else { symbol.to_string() },
            icon: icon.to_string(),
        })
    }

    /// Age in hours relative to `now`, never negative
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        let seconds = (now - self.created_at).num_seconds().max(0);
        seconds as f64 / 3600.0
    }
}

/// Fields needed to create a token record
#[derive(Debug, Clone, PartialEq)]
pub struct NewToken {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&ListedToken> for NewToken {
    fn from(listed: &ListedToken) -> Self {
        Self {
            address: listed.address.clone(),
            name: listed.name.clone(),
            symbol: listed.symbol.clone(),
            decimals: listed.decimals,
            icon: listed.icon.clone(),
            created_at: listed.listed_at,
        }
    }
}

/// Accepted name/symbol/icon overwrite
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityUpdate {
    pub name: String,
    pub symbol: String,
    pub icon: String,
}

/// Immutable market observation for one token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub token_id: TokenId,
    pub figures: MarketFigures,
    pub source: ProviderKind,
    pub observed_at: DateTime<Utc>,
}

impl MarketSnapshot {
    pub fn new(token_id: TokenId, figures: MarketFigures, source: ProviderKind) -> Self {
        Self {
            token_id,
            figures,
            source,
            observed_at: Utc::now(),
        }
    }

    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = at;
        self
    }
}

/// Name, symbol and icon for an address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicInfo {
    pub name: String,
    pub symbol: String,
    pub icon: Option<String>,
    pub decimals: Option<u8>,
}

/// Identity plus market figures from one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub icon: Option<String>,
    pub figures: MarketFigures,
    pub source: ProviderKind,
}

impl TokenInfo {
    pub fn basic(&self) -> BasicInfo {
        BasicInfo {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            icon: self.icon.clone(),
            decimals: Some(self.decimals),
        }
    }
}

/// Entry from a provider's new-listings feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedToken {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub icon: Option<String>,
    pub listed_at: DateTime<Utc>,
    pub figures: MarketFigures,
    pub source: ProviderKind,
}
