//! Domain layer for field authorization.

pub mod builtins;
pub mod entry_points;
pub mod evaluator;
pub mod field_map;
pub mod group;
pub mod guard;
pub mod registry;
