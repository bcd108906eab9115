// src/utils/mod.rs

pub mod hash;
pub mod json;
pub mod jwt;
