//! Supabase client for email one-time-code auth and PostgREST tables.

mod client;
mod error;
mod types;

pub use client::SupabaseClient;
pub use error::SupabaseError;
pub use types::*;
