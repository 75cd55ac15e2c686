//! Loaders: the file-system/HTTP glue that turns a scan or simulation
//! request into the `ScanInput` the orchestrator consumes. Out of the
//! core's scope proper, but the contracts it depends upon.

pub mod checklist;
pub mod images;

pub use checklist::{load_checklist_definition, load_checklist_definition_cached};
pub use images::{fetch_image_urls, load_room_images_from_dir};
