//! Command-line dashboard client: HTTP access to the backend, the session
//! repository and the state container the CLI renders from.

pub mod api;
pub mod error;
pub mod session;
pub mod store;

pub use api::ApiClient;
pub use error::{ClientError, ClientResult};
pub use session::{FileSessionRepository, MemorySessionRepository, Session, SessionRepository};
pub use store::{Action, DashboardState, Store};
