//! Service modules for message preparation

pub mod composer;
pub mod credential_pool;
pub mod personalization;
pub mod tags;
pub mod validator;
pub mod variation;

// Re-export service types
pub use composer::{build_message, render_draft, resolve_sender, Sender};
pub use credential_pool::CredentialPool;
pub use personalization::Personalizer;
pub use tags::render_tags;
pub use validator::{
    GenericAddressCheck, MxRecordCheck, RecipientCheck, RecipientValidator, SyntaxCheck, ValidationOutcome,
    Verdict,
};
pub use variation::{
    analyze, apply_variations, apply_variations_with, count_variations, extract_variation_slots,
    first_variation,
};
