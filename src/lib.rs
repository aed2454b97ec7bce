pub mod api;
pub mod config;
pub mod domain;
pub mod entitlements;
pub mod error;
pub mod gateways;
pub mod pricing;
pub mod repository;
pub mod service;
