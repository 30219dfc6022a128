pub mod cache;
pub mod encyclopedia;
pub mod info;
pub mod resolver;
pub mod static_table;
pub mod store;

pub use cache::{InfoCache, InfoState};
pub use encyclopedia::SummaryError;
pub use info::RegionInfo;
pub use resolver::{InfoResolver, InfoSources, Resolution, SummarySource, SummaryWrite, request_info};
pub use static_table::{StaticEntry, StaticTable};
pub use store::{StoreDocument, StoreError, StoreRecord, Upsert};
