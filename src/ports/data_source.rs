//! Asset Data Source Port - Upstream Market Data Interface
//!
//! One implementation is wired per deployment (asset-listing API or
//! exchange ticker API), chosen by configuration. The supervisor never
//! branches on which one it holds.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::{Asset, FetchResult};

/// Trait for market data providers.
///
/// Implementors issue exactly one upstream request per call and map the
/// response into a snapshot set. When `cancel` fires the call must
/// return `FetchError::Aborted` promptly without further I/O.
#[async_trait]
pub trait AssetDataSource: Send + Sync + 'static {
  /// Fetch the full snapshot set.
  ///
  /// An empty `Ok` vector is allowed here; the supervisor treats it as
  /// an invalid payload.
  async fn fetch_assets(&self, cancel: &CancellationToken) -> FetchResult<Vec<Asset>>;

  /// Short provider name for logs and metrics.
  fn name(&self) -> &'static str;
}
