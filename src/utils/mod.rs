pub mod config;
pub mod fd_limit;
pub mod keysift_toml;
pub mod logger;
pub mod results;
pub mod tempfiles;

pub use config::*;
pub use fd_limit::{FDS_PER_WORKER, cap_workers_by_fd_limit, max_open_fds, max_workers_by_fd_limit};
pub use logger::{Colors, setup_logging};
pub use results::{EMPTY_MARKER, format_result_line, save_found};
pub use tempfiles::{TempCopy, copy_to_private, private_copy_path_for};
