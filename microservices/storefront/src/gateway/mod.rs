pub mod provider;
pub mod signature;

pub use provider::{
    GatewayError, PaymentGateway, PaymentRequest, PaymentResponse, VerificationResponse,
    ZarinpalGateway,
};
pub use signature::verify_callback_signature;
