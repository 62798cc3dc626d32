pub mod db;
pub mod detect;
pub mod schema;
pub mod store;
pub mod xml;

pub use db::SqliteStore;
pub use schema::{Tally, VoteSummary};
pub use store::{MemoryStore, StoreError, VoteStore};
