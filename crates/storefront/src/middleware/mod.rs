//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Maintenance mode (503 for everything but health checks)
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. Rate limiting (governor, address verification and checkout only)

pub mod maintenance;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use maintenance::maintenance_middleware;
pub use rate_limit::{address_rate_limiter, checkout_rate_limiter};
pub use request_id::{RequestId, request_id_middleware};
pub use session::{create_session_layer, session_layer};
