//! Client modules for external services

pub mod api;
pub mod dns;
pub mod openai;
pub mod smtp;
pub mod traits;

// Re-export all client types
pub use api::ApiDeliveryClient;
pub use dns::{DnsError, HickoryMxResolver, MxRecord};
pub use openai::OpenAiClient;
pub use smtp::SmtpDeliveryClient;
pub use traits::{DeliveryProvider, MxResolver, TextCompleter};
