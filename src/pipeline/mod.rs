pub mod filter;
pub mod ingestor;
pub mod normalize;

pub use filter::filter;
pub use ingestor::{IngestReport, Ingestor};
pub use normalize::normalize;
