//! Transient user notifications.
//!
//! A `NotificationCenter` owns the single "toast showing" slot. While a toast is
//! visible every further request is dropped, so bursts of failures collapse into
//! one message instead of stacking.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::errors::AppError;

pub const NO_INTERNET_TITLE: &str = "No internet connection";
pub const NO_INTERNET_MESSAGE: &str = "Please check your internet settings";
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastCategory {
    Success,
    #[default]
    Error,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastPosition {
    Top,
    #[default]
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub category: ToastCategory,
    pub position: ToastPosition,
    pub title: String,
    pub message: String,
    pub visibility: Duration,
}

impl Toast {
    /// Empty title or message fall back to the connectivity wording.
    pub fn new(category: ToastCategory, title: impl Into<String>, message: impl Into<String>) -> Self {
        let title = title.into();
        let message = message.into();
        Self {
            category,
            position: ToastPosition::default(),
            title: if title.trim().is_empty() {
                NO_INTERNET_TITLE.to_string()
            } else {
                title
            },
            message: if message.trim().is_empty() {
                NO_INTERNET_MESSAGE.to_string()
            } else {
                message
            },
            visibility: Duration::from_secs(5),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToastCategory::Error, title, message)
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToastCategory::Success, title, message)
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToastCategory::Info, title, message)
    }

    #[must_use]
    pub fn at(mut self, position: ToastPosition) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn visible_for(mut self, visibility: Duration) -> Self {
        self.visibility = visibility;
        self
    }
}

/// Platform surface that actually renders a toast.
pub trait NotificationSurface: Send + Sync {
    fn display(&self, toast: &Toast);
}

/// Renders toasts through the log, used by the headless binary.
#[derive(Debug, Default)]
pub struct LogSurface;

impl NotificationSurface for LogSurface {
    fn display(&self, toast: &Toast) {
        match toast.category {
            ToastCategory::Error => log::error!("[{}] {}", toast.title, toast.message),
            ToastCategory::Success | ToastCategory::Info => {
                log::info!("[{}] {}", toast.title, toast.message)
            }
        }
    }
}

pub struct NotificationCenter {
    surface: Arc<dyn NotificationSurface>,
    /// When the visible toast hides itself, `None` if nothing is showing
    showing_until: Mutex<Option<Instant>>,
    app_name: String,
    position: ToastPosition,
    visibility: Duration,
    silent_error_code: Option<String>,
}

impl NotificationCenter {
    pub fn new(surface: Arc<dyn NotificationSurface>, config: &Config) -> Self {
        Self {
            surface,
            showing_until: Mutex::new(None),
            app_name: config.app_name.clone(),
            position: config.notification_position,
            visibility: config.notification_visibility(),
            silent_error_code: config.silent_error_code.clone(),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<Instant>> {
        self.showing_until.lock().unwrap_or_else(|e: PoisonError<_>| {
            log::warn!("Notification slot lock poisoned (non-critical), recovering");
            e.into_inner()
        })
    }

    /// Display `toast` unless another one is still visible. Returns whether it was shown.
    pub fn show(&self, toast: Toast) -> bool {
        {
            let mut slot = self.slot();
            let now = Instant::now();

            if matches!(*slot, Some(until) if now < until) {
                log::debug!("Toast suppressed while another is visible: {}", toast.message);
                return false;
            }
            *slot = Some(now + toast.visibility);
        }

        // The surface may call back into `dismiss`, so the slot must not be held here
        self.surface.display(&toast);
        true
    }

    /// Called by the surface when the visible toast is hidden early.
    pub fn dismiss(&self) {
        *self.slot() = None;
    }

    pub fn is_showing(&self) -> bool {
        matches!(*self.slot(), Some(until) if Instant::now() < until)
    }

    fn toast(&self, category: ToastCategory, message: impl Into<String>) -> Toast {
        Toast::new(category, self.app_name.clone(), message)
            .at(self.position)
            .visible_for(self.visibility)
    }

    pub fn notify_offline(&self) -> bool {
        self.show(
            Toast::error(NO_INTERNET_TITLE, NO_INTERNET_MESSAGE)
                .at(self.position)
                .visible_for(self.visibility),
        )
    }

    /// The toast `error` maps to, or `None` when it must stay silent.
    pub fn toast_for(&self, error: &AppError) -> Option<Toast> {
        if error.is_silent(self.silent_error_code.as_deref()) {
            return None;
        }

        let toast = match error {
            AppError::Offline => Toast::error(NO_INTERNET_TITLE, NO_INTERNET_MESSAGE)
                .at(self.position)
                .visible_for(self.visibility),
            AppError::Server { .. } => self.toast(
                ToastCategory::Error,
                error.server_message().unwrap_or(GENERIC_ERROR_MESSAGE),
            ),
            e if e.is_validation() => self.toast(ToastCategory::Error, e.to_string()),
            _ => self.toast(ToastCategory::Error, GENERIC_ERROR_MESSAGE),
        };
        Some(toast)
    }

    /// Report `error` to the user following the error taxonomy.
    pub fn report_error(&self, error: &AppError) -> bool {
        match self.toast_for(error) {
            Some(toast) => self.show(toast),
            None => {
                log::debug!("Not notifying user about silent error: {}", error);
                false
            }
        }
    }
}
