use crate::series::*;

#[cfg(test)]
use mockall::{automock};

/// Local cache for fetched price series, keyed by entry name.
#[cfg_attr(test, automock)]
pub trait Storage {
    fn save_series(&mut self, name : &str, points : &Vec<PricePoint>, metadata : &SeriesMetadata) -> anyhow::Result<()>;
    fn load_series(&mut self, name : &str) -> anyhow::Result<(Vec<PricePoint>, SeriesMetadata)>;
}
