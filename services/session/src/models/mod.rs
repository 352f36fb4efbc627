//! Data models for the session core

pub mod role;
pub mod user;

pub use role::Role;
pub use user::{
    ExchangeRequest, ExchangeResponse, RefreshResponse, UpdateMeRequest, UserProfile,
};
