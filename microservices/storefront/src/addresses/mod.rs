pub mod service;

pub use service::{AddressBook, NewAddress};
