pub mod broker;
pub mod config;
pub mod error;
pub mod hyper;
pub mod types;

pub use broker::{
    AccountView, IndicatorOutput, IndicatorSpec, MarketView, OrderSink, TradeContext,
};
pub use config::Config;
pub use error::{Error, Result};
pub use hyper::{HyperParams, ParamKind, ParamSpec, ParamValue};
pub use types::*;
