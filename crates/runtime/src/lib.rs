//! Runtime utilities for Routerscope.

pub mod health;
pub mod shutdown;
