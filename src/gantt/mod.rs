//! Gantt chart core: the date-indexed grid, task placement, drag
//! validation, dependency graph checks and the overlays drawn on top.

pub mod critical;
pub mod debug;
pub mod dependency;
pub mod drag;
pub mod position;
pub mod svg;
pub mod timeline;
