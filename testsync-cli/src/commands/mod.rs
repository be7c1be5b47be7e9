pub mod branch;
pub mod classify;
pub mod prune;
pub mod serve;
pub mod test_path;
pub mod verify;
