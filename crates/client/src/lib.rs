//! Session-aware REST client, storage scopes and locale context.

pub mod api;
pub mod config;
pub mod locale;
pub mod session;
pub mod storage;
pub mod tokens;
pub mod transport;
pub mod views;

pub use config::ClientConfig;
pub use locale::{LocaleContext, LocaleState, RootAttributes};
pub use session::{ApiClient, SessionEvent, LOGIN_ROUTE};
pub use storage::{FileStore, KeyValueStore, KeyValueStoreExt, MemoryStore, StorageEvent};
pub use tokens::TokenStore;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};
pub use views::ListState;
