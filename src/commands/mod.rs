pub mod bookmark;
pub mod inventory;
pub mod split;
