// BPGuide Domain
// This crate contains the business logic for the BPGuide application

// Services that implement business logic
pub mod services;

// Domain entities
pub mod entities;

// Health checks and system status
pub mod health;

// Environment configuration
pub mod config;

// Testing utilities - only available in tests and with the mock feature
#[cfg(any(test, feature = "mock"))]
pub mod testing;
