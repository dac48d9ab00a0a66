pub mod session;

// Re-export handler functions for use in routing
pub use session::whoami as session_whoami;
pub use session::logout as session_logout;
