// Bicycle Rental Management - Core Library
// Exposes the store, the four rental operations, and the seed importer
// for use in the CLI and tests.

pub mod clock;
pub mod db;
pub mod entities;
pub mod error;
pub mod import;
pub mod policy;
pub mod recommend;
pub mod rent;
pub mod returns;
pub mod search;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use db::{open, open_in_memory, setup_database, OpenRental};
pub use entities::{
    Bicycle, BikeStatus, Condition, Fee, FeeType, Member, RentalTransaction, ReturnReceipt,
    TxStatus,
};
pub use error::{RentalError, Result};
pub use import::{load_bicycles, load_members, ImportSummary};
pub use policy::{RentalPolicy, Scoring};
pub use recommend::{recommend, Recommendation};
pub use rent::rent;
pub use returns::return_bicycle;
pub use search::{search, SearchQuery, SortKey};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
