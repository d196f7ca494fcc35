pub mod service;

pub use service::TarotService;
