//! Location and weather lookup behind a short-lived edge cache.
//!
//! Resolves a visitor's IP via ipapi.co, fetches current conditions from
//! Open-Meteo, and caches the merged record per IP for a few minutes. Upstream
//! failures are answered with a fixed fallback record.

pub mod cache;
pub mod client_ip;
pub mod clock;
pub mod fallback;
pub mod fetch;
pub mod geoip;
pub mod handler;
pub mod provider;
pub mod types;

pub use cache::{CacheStore, MemoryCacheStore};
pub use client_ip::resolve_client_ip;
pub use clock::{Clock, SystemClock};
pub use fetch::LocationWeatherFetcher;
pub use handler::{EdgeHandler, HandlerSettings};
pub use types::*;
