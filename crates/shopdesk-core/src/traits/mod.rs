//! Collaborator seams. Every managed service ShopDesk talks to sits behind one
//! of these traits so orchestration code can run against fakes.

pub mod provider;
pub mod search;
pub mod storage;
pub mod store;

pub use provider::{ChatProvider, EmbeddingProvider};
pub use search::{SearchIndex, SearchIndexes};
pub use storage::FileStorage;
pub use store::{OrderStore, ReturnStore};
