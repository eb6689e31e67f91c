pub mod aggregator;
pub mod api;
pub mod blocks;
pub mod config;
pub mod db;
pub mod error;
pub mod explorer;
pub mod grouper;
pub mod models;
pub mod movements;
pub mod pairer;
pub mod parser;
pub mod points;
pub mod prices;
pub mod reconcile;
pub mod throttle;
pub mod tracker;
pub mod units;
pub mod validation;

pub use aggregator::{aggregate, PriceBook};
pub use api::{router, ApiError, AppState};
pub use error::{ReconcileError, SkippedTransaction};
pub use models::{ProviderLists, SwapRecord};
pub use points::{calculate_points, next_threshold};
pub use reconcile::{reconcile, reward_volume};
pub use tracker::{CalculateResponse, Tracker};
