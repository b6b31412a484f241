//! Market data endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AppState;
use crate::domain::views::{TICKER_LENGTH, format_billions, format_change, format_price, marquee};
use crate::domain::{
  Asset, FilterMode, SortConfig, SortDirection, SortKey, TableQuery, TickerEntry, Trend,
};
use crate::usecases::MarketState;

/// `GET /api/market`
pub async fn snapshot(State(state): State<AppState>) -> Json<MarketState> {
  Json(state.handle.state())
}

/// `POST /api/market/refresh`: returns before the fetch completes.
pub async fn refresh(State(state): State<AppState>) -> impl IntoResponse {
  state.handle.refresh();
  StatusCode::ACCEPTED
}

/// Query string of the table view.
#[derive(Debug, Default, Deserialize)]
pub struct TableParams {
  #[serde(default)]
  pub filter: FilterMode,
  pub search: Option<String>,
  pub sort: Option<SortKey>,
  pub direction: Option<SortDirection>,
}

impl From<TableParams> for TableQuery {
  fn from(params: TableParams) -> Self {
    Self {
      filter: params.filter,
      search: params.search.filter(|s| !s.trim().is_empty()),
      sort: params
        .sort
        .map(|key| SortConfig::new(key, params.direction.unwrap_or_default())),
    }
  }
}

/// One table row: the asset plus its display strings.
#[derive(Debug, Serialize)]
pub struct TableRow<'a> {
  #[serde(flatten)]
  pub asset: &'a Asset,
  pub price_display: String,
  pub change_display: String,
  pub market_cap_display: String,
  pub trend: Option<Trend>,
}

impl<'a> From<&'a Asset> for TableRow<'a> {
  fn from(asset: &'a Asset) -> Self {
    Self {
      asset,
      price_display: format_price(asset.current_price),
      change_display: format_change(asset.price_change_percentage_24h),
      market_cap_display: format_billions(asset.market_cap),
      trend: asset.trend(),
    }
  }
}

#[derive(Debug, Serialize)]
struct TableResponse<'a> {
  filter: FilterMode,
  sort: SortConfig,
  count: usize,
  rows: Vec<TableRow<'a>>,
  is_loading: bool,
  error: Option<&'a str>,
}

/// `GET /api/market/table`
pub async fn table(
  State(state): State<AppState>,
  Query(params): Query<TableParams>,
) -> impl IntoResponse {
  let market = state.handle.state();
  let query = TableQuery::from(params);
  let sort = query.sort.unwrap_or_else(|| query.filter.default_sort());
  let rows: Vec<TableRow<'_>> = query.apply(&market.assets).into_iter().map(TableRow::from).collect();
  debug!(?query, rows = rows.len(), "Table view requested");

  Json(TableResponse {
    filter: query.filter,
    sort,
    count: rows.len(),
    rows,
    is_loading: market.is_loading,
    error: market.error.as_deref(),
  })
  .into_response()
}

/// `GET /api/market/ticker`
pub async fn ticker(State(state): State<AppState>) -> Json<Vec<TickerEntry>> {
  let market = state.handle.state();
  Json(
    marquee(&market.assets, TICKER_LENGTH)
      .into_iter()
      .map(TickerEntry::from)
      .collect(),
  )
}

/// `GET /api/market/:id`
pub async fn asset_detail(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> impl IntoResponse {
  let market = state.handle.state();
  match market.assets.into_iter().find(|a| a.id == id) {
    Some(asset) => Json(asset).into_response(),
    None => (StatusCode::NOT_FOUND, format!("Unknown asset: {id}")).into_response(),
  }
}
