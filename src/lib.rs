pub mod app;
#[cfg(feature = "cli")]
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, toml_config::TomlConfig, CliConfig};

pub use app::pipelines::{ChunkedPipeline, CsvPipeline};
pub use core::etl::{EtlEngine, EtlStatus};
pub use core::statistics::{StatisticsEngine, StatisticsOptions};
pub use utils::error::{EtlError, Result};
