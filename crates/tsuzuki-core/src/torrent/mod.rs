pub mod feed;
pub mod query;
pub mod resolver;
pub mod scorer;

pub use feed::{FeedSource, NyaaFeed};
pub use query::{FeedEndpoint, FeedEndpoints, FeedRequest, SearchMode};
pub use resolver::{Resolution, ResolveRequest, Resolver};
pub use scorer::{EpisodeTarget, MatchRequest, ScoreVector, ScoredCandidate};
