pub mod cache;
pub mod divination;
pub mod draw;
pub mod fetcher;
pub mod integrity;

pub use crate::domain::model::{Card, DrawResult, Formation, Orientation, Reading};
pub use crate::domain::ports::{ImageTransport, MessageSink};
pub use crate::utils::error::Result;
