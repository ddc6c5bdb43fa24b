pub mod lock;
pub mod slug;
pub mod text;
