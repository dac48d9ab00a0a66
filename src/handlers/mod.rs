// Handlers by security tier:
// Public (no auth) → Protected (JWT auth), plus guarded page routes

pub mod pages; // Page view models behind the navigation guard
pub mod protected; // JWT authentication required (/api/*)
pub mod public; // No authentication required (/auth/*)
