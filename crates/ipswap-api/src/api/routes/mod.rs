//! API route handlers

pub mod change_ip;
pub mod diagnose;
pub mod health;
