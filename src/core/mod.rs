//! Core helpers - path resolution, templates, regex field extraction

pub mod extract;
pub mod path;
pub mod template;

pub use extract::extract;
pub use path::{is_within, normalize, resolve};
pub use template::{get_by_path, render, value_to_string};
