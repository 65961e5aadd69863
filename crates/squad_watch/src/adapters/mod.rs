//! Local implementations of the engine's collaborators.

mod admin_files;
mod catalog_file;
mod log_file;
mod offline_control;

pub use admin_files::AdminFilesSource;
pub use catalog_file::JsonFileLayerSource;
pub use log_file::FileTailLogReader;
pub use offline_control::OfflineControlChannel;
