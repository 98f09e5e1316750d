mod callback_signature;

pub use callback_signature::{callback_signature, verify_callback_signature};
