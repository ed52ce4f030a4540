pub mod captions;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod video_id;
