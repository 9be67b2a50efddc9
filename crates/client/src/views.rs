//! List-view states for dashboard tables.

use crate::locale::LocaleContext;
use gymdesk_core::error::GymResult;

/// Literal text shown when the backend fails with a 5xx.
pub const SERVER_ERROR: &str = "Server error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListState<T> {
    Loading,
    Loaded(Vec<T>),
    Empty,
    Failed(String),
}

impl<T> ListState<T> {
    pub fn from_result(result: GymResult<Vec<T>>) -> Self {
        match result {
            Ok(items) if items.is_empty() => Self::Empty,
            Ok(items) => Self::Loaded(items),
            Err(e) if e.is_server_error() => Self::Failed(SERVER_ERROR.to_string()),
            Err(e) => Self::Failed(e.detail()),
        }
    }

    /// Inline message for the non-loaded states, e.g. `No leaves found`.
    /// Server-supplied failure details are shown as received.
    pub fn message(&self, ctx: &LocaleContext, noun: &str) -> Option<String> {
        match self {
            Self::Loading => Some(ctx.t("list.loading").to_string()),
            Self::Empty => Some(ctx.t("list.empty").replace("{noun}", noun)),
            Self::Failed(msg) if msg == SERVER_ERROR => {
                Some(ctx.t("list.server_error").to_string())
            }
            Self::Failed(msg) => Some(msg.clone()),
            Self::Loaded(_) => None,
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            Self::Loaded(items) => items,
            _ => &[],
        }
    }
}
