/// Custom thumbnail save/view/delete
pub mod thumbnail;
