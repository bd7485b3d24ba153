use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One closed OHLCV candle, supplied externally in chronological order.
/// Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
}

/// Candle interval. String forms follow the usual exchange kline
/// convention ("1m", "5m", "4h", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Timeframe {
    Min1,
    Min5,
    Min15,
    Min30,
    Hour1,
    Hour4,
    Day1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Min1 => "1m",
            Timeframe::Min5 => "5m",
            Timeframe::Min15 => "15m",
            Timeframe::Min30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Day1 => "1d",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Timeframe::Min1),
            "5m" => Ok(Timeframe::Min5),
            "15m" => Ok(Timeframe::Min15),
            "30m" => Ok(Timeframe::Min30),
            "1h" => Ok(Timeframe::Hour1),
            "4h" => Ok(Timeframe::Hour4),
            "1d" => Ok(Timeframe::Day1),
            other => Err(format!("unknown timeframe '{other}'")),
        }
    }
}

impl TryFrom<String> for Timeframe {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> String {
        tf.as_str().to_string()
    }
}

/// Side of an open position. `Flat` means no position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
    Flat,
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionSide::Long => write!(f, "long"),
            PositionSide::Short => write!(f, "short"),
            PositionSide::Flat => write!(f, "flat"),
        }
    }
}

/// Read-only view of the current position, owned by the external
/// execution layer. The evaluator never mutates position state
/// directly; it only issues intents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionView {
    pub side: PositionSide,
    pub qty: f64,
    pub entry_price: f64,
}

impl PositionView {
    pub fn flat() -> Self {
        Self {
            side: PositionSide::Flat,
            qty: 0.0,
            entry_price: 0.0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.side != PositionSide::Flat && self.qty > 0.0
    }
}

/// Trend reading derived each bar. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendVerdict {
    Bullish,
    Bearish,
    Neutral,
}

impl std::fmt::Display for TrendVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendVerdict::Bullish => write!(f, "bullish"),
            TrendVerdict::Bearish => write!(f, "bearish"),
            TrendVerdict::Neutral => write!(f, "neutral"),
        }
    }
}

/// Entry verdict for the current bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryDecision {
    Long,
    Short,
    None,
}

/// Per-bar verdict for an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    Hold,
    Liquidate,
}

/// Venue capability class. Spot venues cannot short and have no margin
/// or liquidation price; futures venues trade on leveraged margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    Spot,
    Futures,
}

impl std::fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeKind::Spot => write!(f, "spot"),
            ExchangeKind::Futures => write!(f, "futures"),
        }
    }
}

/// What an order intent asks the execution layer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    Buy,
    Sell,
    StopLoss,
    TakeProfit,
    Liquidate,
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntentKind::Buy => write!(f, "buy"),
            IntentKind::Sell => write!(f, "sell"),
            IntentKind::StopLoss => write!(f, "stop_loss"),
            IntentKind::TakeProfit => write!(f, "take_profit"),
            IntentKind::Liquidate => write!(f, "liquidate"),
        }
    }
}

/// An instruction handed to the external execution layer. The evaluator
/// only emits these; fills and bookkeeping happen outside, strictly
/// between bars.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub id: String,
    pub kind: IntentKind,
    pub qty: f64,
    pub price: f64,
}

impl OrderIntent {
    pub fn new(kind: IntentKind, qty: f64, price: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            qty,
            price,
        }
    }

    /// A liquidate instruction carries no qty/price; the execution
    /// layer flattens whatever is open.
    pub fn liquidate() -> Self {
        Self::new(IntentKind::Liquidate, 0.0, 0.0)
    }
}
