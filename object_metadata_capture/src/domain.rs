//! This module defines all members of the domain

pub mod models;
pub mod ports;
pub mod record;
pub mod services;
