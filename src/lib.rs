pub mod camera_cache;
pub mod capture;
pub mod config;
pub mod error;
pub mod events;
pub mod filters;
pub mod geometry;
pub mod pipeline;
pub mod video;
pub mod processing {
    pub mod canvas;
    pub mod color;
    pub mod compose;
    pub mod font;
    pub mod sampler;
}
pub mod render {
    pub mod debounce;
    pub mod overlay;
    pub mod presenter;
    pub mod surface;
}
pub mod tasks {
    pub mod booth;
    pub mod saver;
}
