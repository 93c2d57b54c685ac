//! Virtual filesystem and shell interpreter for the codeshell IDE.
//!
//! The crate is platform neutral: persistence is injected through
//! [`core::PersistenceStore`], and streaming commands are driven by the host
//! through [`core::SessionManager::tick`] or [`core::SessionManager::drive`].

pub mod config;
pub mod core;
pub mod models;
mod utils;

pub use utils::BoundedLog;
