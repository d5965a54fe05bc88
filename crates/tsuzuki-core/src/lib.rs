pub mod config;
pub mod db;
pub mod episodes;
pub mod error;
pub mod models;
pub mod normalize;
pub mod scheduler;
pub mod state;
pub mod storage;
pub mod title;
pub mod torrent;
