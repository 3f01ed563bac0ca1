use chrono::NaiveDate;

use crate::series::*;
use crate::storage::*;

pub fn fetch_series(store : &mut impl SeriesStore,
                    storage : &mut impl Storage,
                    symbol : &str,
                    from_date : &NaiveDate,
                    to_date : &NaiveDate) -> anyhow::Result<String> {
    let points = store.fetch_daily_closes(symbol, from_date, to_date)?;
    validate_ordering(&points)?;

    let entry_name = format!("{}_{}_{}",
        symbol.replace("/", "_"),
        from_date.format("%Y%m%d"),
        to_date.format("%Y%m%d"));
    let metadata = SeriesMetadata {
        symbol : String::from(symbol),
        from_date : *from_date,
        to_date : *to_date
    };
    storage.save_series(&entry_name, &points, &metadata)?;

    Ok(entry_name)
}
