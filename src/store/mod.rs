pub mod alerts;
pub mod google;
pub mod listings;
pub mod memory;
pub mod schema;
pub mod traits;

pub use alerts::{AlertRecord, AlertRepository};
pub use google::GoogleSheetsStore;
pub use listings::ListingRepository;
pub use memory::InMemorySpreadsheet;
pub use schema::StoredListing;
pub use traits::SpreadsheetStore;
