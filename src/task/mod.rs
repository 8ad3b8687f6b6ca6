pub mod radio_link;
pub mod range_pipeline;
pub mod resources;
