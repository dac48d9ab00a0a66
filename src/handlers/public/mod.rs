// Public handlers (no authentication required)
//
// Route Prefix: /auth/*
// Middleware: none

pub mod auth;

pub use auth::*;
