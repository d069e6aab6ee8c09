pub mod catalog;
pub mod db;

pub use catalog::GoogleBooksAdapter;
pub use db::DbAdapter;
