//! Executed trade records and their aggregates.

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub asset_id: String,
    pub side: Side,
    pub market_price: f64,
    pub executed_price: f64,
    pub quantity: f64,
    pub fee: f64,
    pub slippage_cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TradeStats {
    pub total_trades: usize,
    pub total_fees_paid: f64,
    pub total_slippage_cost: f64,
}

impl TradeStats {
    pub fn record(&mut self, trade: &TradeRecord) {
        self.total_trades += 1;
        self.total_fees_paid += trade.fee;
        self.total_slippage_cost += trade.slippage_cost;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade(side: Side, fee: f64, slippage_cost: f64) -> TradeRecord {
        TradeRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            asset_id: "BTC".into(),
            side,
            market_price: 100.0,
            executed_price: 100.05,
            quantity: 1.0,
            fee,
            slippage_cost,
        }
    }

    #[test]
    fn stats_accumulate() {
        let mut stats = TradeStats::default();
        stats.record(&sample_trade(Side::Buy, 10.0, 5.0));
        stats.record(&sample_trade(Side::Sell, 2.5, 1.0));
        assert_eq!(stats.total_trades, 2);
        assert!((stats.total_fees_paid - 12.5).abs() < f64::EPSILON);
        assert!((stats.total_slippage_cost - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn side_serializes_lowercase() {
        let json = serde_json::to_string(&Side::Sell).unwrap();
        assert_eq!(json, "\"sell\"");
    }
}
