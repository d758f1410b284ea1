//! Template Pipeline Module

pub mod ir;
pub mod src;
