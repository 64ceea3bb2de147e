pub mod phone;
pub mod sender_cache;
