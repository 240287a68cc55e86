pub mod service;

pub use service::ProductCatalog;
