pub mod service;

pub use service::{CheckoutService, SubmitItem, SubmitOrder};
