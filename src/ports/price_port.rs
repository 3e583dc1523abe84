//! Price data access port.

use crate::domain::error::QubotraderError;
use crate::domain::price::PriceTable;

pub trait PriceSource {
    fn load_prices(&self) -> Result<PriceTable, QubotraderError>;

    /// Asset ids available from this source, ascending.
    fn list_assets(&self) -> Result<Vec<String>, QubotraderError> {
        Ok(self.load_prices()?.assets().to_vec())
    }
}
