pub mod collection;
pub mod domain;
pub mod memory;
pub mod ports;
pub mod rules;
pub mod status;

pub use collection::{BookCollection, CollectionError, CollectionResult, LoadState};
pub use domain::{
    AuthSession, Book, BookPatch, CatalogEntry, NewBook, NewBookRecord, User, UserCredentials,
    PLACEHOLDER_COVER,
};
pub use memory::InMemoryStore;
pub use ports::{AccountStore, BookRepository, CatalogSearchService, PortError, PortResult};
pub use status::{ReadingStats, ReadingStatus, Shelves};
