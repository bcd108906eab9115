// src/models/mod.rs

pub mod payment;
pub mod premium;
pub mod question;
pub mod quiz_result;
pub mod subscription;
pub mod user;
