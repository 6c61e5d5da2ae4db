// HTML fragments and escaping
pub mod html;

// Per-section rendering and the three section states
pub mod renderer;

// Ordered section catalog
pub mod catalog;

// Section collectors
pub mod collect;

// Streams sections into the report file
pub mod composer;

// Re-export main types
pub use catalog::{SectionContent, SectionDescriptor, CATALOG};
pub use composer::ReportComposer;
pub use renderer::{ReportSection, SectionBody, SectionState};
