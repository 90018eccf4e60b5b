//! Lifecycle events delivered by the store's watch feed.

use crate::error::{ManagerError, ManagerResult};
use crate::resource::{ConfigObject, ResourceIdentifier};

/// One emission of the watch/resync feed.
///
/// Dispatch with an exhaustive `match`; adding a variant is a compile error
/// at every consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// The store reported an object's existence.
    Added(ConfigObject),
    /// A later version of a known object was observed.
    Updated {
        /// The previous version as seen by the feed.
        old: ConfigObject,
        /// The current version.
        new: ConfigObject,
    },
    /// The object was removed.
    Deleted(ConfigObject),
    /// The object existed before a gap in delivery; its state during the gap is unknown.
    PossiblyChanged(ConfigObject),
}

/// Event discriminant used for logging and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// [`LifecycleEvent::Added`]
    Added,
    /// [`LifecycleEvent::Updated`]
    Updated,
    /// [`LifecycleEvent::Deleted`]
    Deleted,
    /// [`LifecycleEvent::PossiblyChanged`]
    PossiblyChanged,
}

impl EventKind {
    /// Returns a stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::PossiblyChanged => "possibly_changed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LifecycleEvent {
    /// Builds an `Updated` event, enforcing `old.identifier == new.identifier`.
    pub fn updated(old: ConfigObject, new: ConfigObject) -> ManagerResult<Self> {
        if old.identifier != new.identifier {
            return Err(ManagerError::internal(format!(
                "update event identifiers differ: {} != {}",
                old.identifier, new.identifier
            )));
        }
        Ok(Self::Updated { old, new })
    }

    /// Returns the event discriminant.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Added(_) => EventKind::Added,
            Self::Updated { .. } => EventKind::Updated,
            Self::Deleted(_) => EventKind::Deleted,
            Self::PossiblyChanged(_) => EventKind::PossiblyChanged,
        }
    }

    /// Returns the identifier of the object this event concerns.
    #[must_use]
    pub fn identifier(&self) -> &ResourceIdentifier {
        match self {
            Self::Added(obj) | Self::Deleted(obj) | Self::PossiblyChanged(obj) => &obj.identifier,
            Self::Updated { new, .. } => &new.identifier,
        }
    }
}
