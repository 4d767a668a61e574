pub mod aggregator;
pub mod handlers;

pub use aggregator::{DailyApplied, StatisticsSnapshot, StatsAggregator, TRAILING_DAYS};
