//! Evidence extraction crate for CampusBot.
//!
//! Turns raw sources into scored evidence:
//! - [`web`]: bounded keyword-guided page extraction (no open crawling)
//! - [`semantic`]: deterministic excerpt selection over long text
//! - [`pdf`]: timetable extraction from weekly schedule PDFs

pub mod pdf;
pub mod semantic;
pub mod types;
pub mod web;

pub use pdf::{ScheduleExtractor, ScheduleSource};
pub use semantic::semantic_search;
pub use types::{Audience, EvidenceUnit, Extraction, ScheduleExtract, SchedulePage};
pub use web::{WebExtractor, WebSource};
