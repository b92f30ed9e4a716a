pub mod loaders;
pub mod lookup;
pub mod store;

pub use loaders::{import_stores_csv, StoreRepository, TomlStoreRepository};
pub use lookup::{BatchReport, LookupPhase, LookupQuery, LookupResult, PHONE_NOT_AVAILABLE};
pub use store::{inject_phone_numbers, StoreRecord, StoreStatus, SHEET_HEADERS};
