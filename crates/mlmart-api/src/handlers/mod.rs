//! Request handlers

pub mod admin;
pub mod health;
pub mod member;
pub mod order;
pub mod wallet;
