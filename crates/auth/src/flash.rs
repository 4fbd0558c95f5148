use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Category of a one-shot notification shown on the next rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Warning,
    /// Credentials changed: the client must drop its session and log in again.
    RelogRequired,
}

/// Transient notification produced by every lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: Cow<'static, str>,
}

impl Flash {
    pub fn new(kind: FlashKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(FlashKind::Success, message)
    }

    pub fn warning(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(FlashKind::Warning, message)
    }

    pub fn relog_required(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(FlashKind::RelogRequired, message)
    }

    pub fn requires_relog(&self) -> bool {
        self.kind == FlashKind::RelogRequired
    }
}
