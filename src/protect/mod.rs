//! Placeholder protection for dates, figures and organisation names.

mod map;
mod patterns;
mod protector;
mod verify;

pub use map::{EntityEntry, EntityMap, Restoration};
pub use patterns::{EntityKind, ProtectError, PLACEHOLDER_PATTERN};
pub use protector::{EntityProtector, EntitySpan, ProtectedText};
pub use verify::EntityAudit;
