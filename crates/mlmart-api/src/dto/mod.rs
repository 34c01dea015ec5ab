//! Data Transfer Objects
//!
//! Request and response structures for the API.

pub mod member;
pub mod order;
pub mod wallet;

pub use member::*;
pub use order::*;
pub use wallet::*;
