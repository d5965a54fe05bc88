pub mod elements;
pub mod keyword;
pub mod parser;
pub mod tokenizer;

pub use elements::{Elements, EpisodeRange, ReleaseFlags};
pub use parser::parse;
