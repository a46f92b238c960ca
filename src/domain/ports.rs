use crate::core::etl::TransformResult;
use crate::core::listing::ListingQuery;
use crate::core::statistics::StatisticsOptions;
use crate::domain::settings::{OutputFormat, RateSource, SourceKind};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn source(&self) -> SourceKind;
    fn rate_source(&self) -> RateSource;
    fn statistics_options(&self) -> StatisticsOptions;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> Vec<OutputFormat>;
    fn workers(&self) -> usize;

    fn listing_query(&self) -> Result<Option<ListingQuery>> {
        Ok(None)
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Extracted: Send + 'static;

    async fn extract(&self) -> Result<Self::Extracted>;
    async fn transform(&self, data: Self::Extracted) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
