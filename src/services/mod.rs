// src/services/mod.rs

pub mod entitlement;
pub mod report;
pub mod scoring;
