pub mod candidate;

pub use candidate::ContactCandidate;
