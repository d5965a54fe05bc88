pub mod anilist;
pub mod discord;
pub mod qbittorrent;
pub mod traits;

pub use traits::{
    AiringEpisode, DownloadClient, DownloadNotice, DownloadRequest, MediaStatus, MediaTitle,
    MetadataProvider, Notifier, WatchingEntry,
};
