//! Sliding-window price forecasting.
//!
//! The engine owns an injected [`PriceModel`](market_core::PriceModel), scales a
//! close-price series into `[0, 1]`, reconstructs the back-test windows and rolls
//! the model forward autoregressively for the requested horizon.

pub mod engine;
pub mod model;
pub mod scaler;
pub mod window;

pub use engine::{ForecastConfig, ForecastEngine, ForecastRun, ScalerFit};
pub use model::LinearWindowModel;
pub use scaler::MinMaxScaler;
pub use window::{sliding_windows, WindowSet};
