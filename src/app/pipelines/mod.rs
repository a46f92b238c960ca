pub mod bundle;
pub mod chunked_pipeline;
pub mod csv_pipeline;

pub use chunked_pipeline::ChunkedPipeline;
pub use csv_pipeline::CsvPipeline;
