//! SQLite persistence for candles, coin details, forecasts, news, insights,
//! the exchange symbol list and user feedback.

pub mod content;
pub mod db;
pub mod error;
pub mod feedback;
pub mod forecasts;
pub mod market;
pub mod models;

pub use db::CoinStore;
pub use error::{StoreError, StoreResult};
pub use models::{CryptoSymbol, Feedback, FeedbackInput, HourlyClose, FEEDBACK_MAX_LEN};
