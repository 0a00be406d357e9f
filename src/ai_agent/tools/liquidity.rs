use crate::ai_agent::data::models::{DerivedTable, LiquidityRatios, MarkerSet, MetricNotice, Period, Ratio};

fn current_ratio(assets: f64, liabilities: f64) -> f64 {
  if liabilities == 0.0 { 0.0 } else { assets / liabilities }
}

/// Current ratio (short-term assets / short-term liabilities) for both periods.
///
/// A missing marker row makes the ratio `Unavailable`, never 0. Zero liabilities give exactly 0.
pub fn liquidity(derived: &DerivedTable, markers: &MarkerSet) -> LiquidityRatios {
  let assets = derived.find(&markers.short_term_assets);
  let liabilities = derived.find(&markers.short_term_liabilities);

  let mut notices: Vec<MetricNotice> = Vec::new();
  if assets.is_none() {
    notices.push(MetricNotice::MissingLiquidityMarker { marker: markers.short_term_assets.clone() });
  }
  if liabilities.is_none() {
    notices.push(MetricNotice::MissingLiquidityMarker { marker: markers.short_term_liabilities.clone() });
  }

  let (assets, liabilities) = match (assets, liabilities) {
    (Some(assets), Some(liabilities)) => (assets, liabilities),
    _ => {
      log::warn!("Current ratio unavailable: {}", notices.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(" "));
      return LiquidityRatios { prior: Ratio::Unavailable, current: Ratio::Unavailable, notices };
    }
  };

  if liabilities.prior_value == 0.0 {
    notices.push(MetricNotice::ZeroLiabilities { period: Period::Prior });
  }
  if liabilities.current_value == 0.0 {
    notices.push(MetricNotice::ZeroLiabilities { period: Period::Current });
  }

  return LiquidityRatios {
    prior: Ratio::Available(current_ratio(assets.prior_value, liabilities.prior_value)),
    current: Ratio::Available(current_ratio(assets.current_value, liabilities.current_value)),
    notices,
  };
}
