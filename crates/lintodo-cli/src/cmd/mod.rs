pub mod check;
pub mod compact;
pub mod list;
