pub mod lifecycle;

pub use lifecycle::{installment_plan, CreditLifecycle, NewCreditRequest};
