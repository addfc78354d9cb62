// Stored records, wire payloads and their mappings

pub mod account;
pub mod user;
pub mod vaccination;
pub mod vaccine;
pub mod validation;

pub use account::*;
pub use user::*;
pub use vaccination::*;
pub use vaccine::*;
pub use validation::{validate_payload, Rules};
