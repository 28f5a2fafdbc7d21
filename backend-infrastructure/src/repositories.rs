pub mod baseline_files;
pub mod clickhouse_store;

pub use baseline_files::*;
pub use clickhouse_store::*;
