// BPGuide Data
// This crate handles persistence of user profiles and blood pressure readings

// Database connection management
pub mod database;

// Repository implementations for data access
pub mod repository;

// Data storage models
pub mod models;
