pub mod aggregator;
pub mod batch;
pub mod chunks;
pub mod city_filter;
pub mod etl;
pub mod listing;
pub mod normalizer;
pub mod rates;
pub mod reader;
pub mod report;
pub mod skills;
pub mod statistics;
pub mod validator;

pub use crate::core::etl::TransformResult;
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
