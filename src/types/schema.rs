//! Column layout of Meteostat hourly bulk files and the column names the resolver reads.

/// Path segment of the hourly bulk endpoint (`/v2/hourly/<station>.csv.gz`).
pub(crate) const HOURLY_PATH_SEGMENT: &str = "hourly";

/// Columns of a headerless hourly bulk CSV, in file order.
pub(crate) const HOURLY_COLUMNS: [&str; 13] = [
    COL_DATE, COL_HOUR, COL_TEMP, "dwpt", COL_RHUM, COL_PRCP, "snow", "wdir", "wspd", "wpgt",
    "pres", "tsun", "coco",
];

pub const COL_DATE: &str = "date";
pub const COL_HOUR: &str = "hour";
/// Air temperature, °C.
pub const COL_TEMP: &str = "temp";
/// Relative humidity, %.
pub const COL_RHUM: &str = "rhum";
/// Precipitation, mm.
pub const COL_PRCP: &str = "prcp";
/// Average / minimum / maximum temperature, present in aggregated (non-hourly) tables.
pub const COL_TAVG: &str = "tavg";
pub const COL_TMIN: &str = "tmin";
pub const COL_TMAX: &str = "tmax";

pub(crate) fn hourly_cache_file_name(station: &str) -> String {
    format!("{}-{}.parquet", HOURLY_PATH_SEGMENT, station)
}

pub(crate) fn hourly_url(station: &str) -> String {
    format!(
        "https://bulk.meteostat.net/v2/{}/{}.csv.gz",
        HOURLY_PATH_SEGMENT, station
    )
}
