// Protected handlers (JWT authentication required)
//
// Route Prefix: /api/*
// Middleware: JWT validation, which injects AuthUser

pub mod auth; // Session endpoints for the signed-in caller
pub mod entries; // Journal entry CRUD

pub use auth::*;
pub use entries::*;
