// Application layer - use cases and orchestration.
// Clients (CLI, HTTP API) talk to `LedgerService`; it owns the store
// transaction boundaries and turns store/domain failures into `AppError`.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
