// src/notify/mod.rs
pub mod email;

pub use email::DigestMailer;
