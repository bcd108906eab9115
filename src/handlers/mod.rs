// src/handlers/mod.rs

pub mod auth;
pub mod payment;
pub mod premium;
pub mod quiz;
pub mod subscription;
