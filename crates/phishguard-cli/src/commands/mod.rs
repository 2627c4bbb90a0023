pub mod access;
pub mod config;
pub mod hash;
pub mod token;
pub mod totp;
