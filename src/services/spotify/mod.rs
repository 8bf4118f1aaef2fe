pub mod account;
pub mod client;
pub mod playlists;
pub mod resolver;
pub mod sync;
