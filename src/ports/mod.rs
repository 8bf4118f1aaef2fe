pub mod spotify;
pub mod tags;
