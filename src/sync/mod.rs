mod synchronizer;

pub use synchronizer::{LoadOutcome, ShowSynchronizer, Source};
