pub mod allocator;
pub mod fallback;
pub mod glide_path;
pub mod scorer;
