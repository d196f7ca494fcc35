pub mod adapters;
pub mod app;
pub mod catalog;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::TarotService;
pub use catalog::Catalog;
pub use config::TarotConfig;
pub use crate::core::{
    cache::{ImageCache, PrimeReport, ReversalStrategy},
    divination::{DivinationRequest, Diviner, FailurePolicy},
    draw::DrawEngine,
    fetcher::{ImageFetcher, RetryPolicy},
    integrity::IntegrityValidator,
};
pub use utils::error::{Result, TarotError};
