//! Locale and text-direction context.
//!
//! The current locale is read through the persistent store on creation,
//! persisted on change and published on a watch channel. Other handles
//! over the same store follow along through [`LocaleContext::listen`].

use crate::config::DEFAULT_CURRENCY;
use crate::storage::{keys, KeyValueStore};
use gymdesk_core::error::GymResult;
use gymdesk_core::i18n::{translate, Direction, Formatter, Locale};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Attributes the presentation root carries for the active locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootAttributes {
    pub lang: &'static str,
    pub dir: &'static str,
    pub data_locale: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleState {
    pub locale: Locale,
    pub direction: Direction,
    pub root: RootAttributes,
}

impl LocaleState {
    pub fn of(locale: Locale) -> Self {
        let direction = locale.direction();
        Self {
            locale,
            direction,
            root: RootAttributes {
                lang: locale.code(),
                dir: direction.as_str(),
                data_locale: locale.code(),
            },
        }
    }
}

#[derive(Clone)]
pub struct LocaleContext {
    store: Option<Arc<dyn KeyValueStore>>,
    state: Arc<watch::Sender<LocaleState>>,
    currency: String,
}

impl LocaleContext {
    /// Reads the saved preference; anything unreadable means English.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let locale = match store.get(keys::LOCALE) {
            Ok(saved) => saved.as_deref().and_then(Locale::parse).unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read saved locale");
                Locale::default()
            }
        };
        Self::build(Some(store), locale)
    }

    /// A context with no backing store, fixed to the default until changed.
    pub fn detached() -> Self {
        Self::build(None, Locale::default())
    }

    fn build(store: Option<Arc<dyn KeyValueStore>>, locale: Locale) -> Self {
        let (state, _) = watch::channel(LocaleState::of(locale));
        Self {
            store,
            state: Arc::new(state),
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn locale(&self) -> Locale {
        self.state.borrow().locale
    }

    pub fn direction(&self) -> Direction {
        self.state.borrow().direction
    }

    pub fn state(&self) -> LocaleState {
        self.state.borrow().clone()
    }

    pub fn root_attributes(&self) -> RootAttributes {
        self.state.borrow().root.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LocaleState> {
        self.state.subscribe()
    }

    /// Persists and applies `locale`.
    pub fn set_locale(&self, locale: Locale) -> GymResult<()> {
        if let Some(store) = &self.store {
            store.set(keys::LOCALE, locale.code())?;
        }
        self.apply(locale);
        Ok(())
    }

    pub fn t<'a>(&self, key: &'a str) -> &'a str {
        translate(self.locale(), key)
    }

    pub fn formatter(&self) -> Formatter {
        Formatter::new(self.locale(), self.currency.clone())
    }

    /// Follows locale changes written through other handles of the store.
    ///
    /// Runs until aborted. Returns `None` for a detached context.
    pub fn listen(&self) -> Option<JoinHandle<()>> {
        let store = self.store.clone()?;
        let mut events = store.subscribe();
        let own_id = store.id();
        let ctx = self.clone();

        Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(ev) if ev.origin != own_id && ev.key == keys::LOCALE => {
                        let locale = ev
                            .new_value
                            .as_deref()
                            .and_then(Locale::parse)
                            .unwrap_or_default();
                        ctx.apply(locale);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "storage events lagged, re-reading locale");
                        if let Ok(saved) = store.get(keys::LOCALE) {
                            ctx.apply(saved.as_deref().and_then(Locale::parse).unwrap_or_default());
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }))
    }

    fn apply(&self, locale: Locale) {
        let changed = self.state.send_if_modified(|state| {
            if state.locale == locale {
                return false;
            }
            *state = LocaleState::of(locale);
            true
        });
        if changed {
            tracing::info!(
                locale = locale.code(),
                dir = locale.direction().as_str(),
                "locale changed"
            );
        }
    }
}
