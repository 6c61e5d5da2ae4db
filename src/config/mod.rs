// Re-export all items from the submodules
mod directives;
mod sections;
mod sources;

// Re-export run configuration
pub use directives::{
    RunConfig,
    parse_config,
    render_default_config,
    create_default_config_file,
};

// Re-export enablement and source vocabularies
pub use sections::SectionName;
pub use sources::{SourceKey, join_collection_path};
