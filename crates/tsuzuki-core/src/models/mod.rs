pub mod candidate;
pub mod series;

pub use candidate::Candidate;
pub use series::SeriesTarget;
