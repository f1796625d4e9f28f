mod client;
#[cfg(test)]
mod fake;
mod traits;

pub use client::GithubClient;
#[cfg(test)]
pub use fake::FakeGateway;
pub use traits::{BranchGateway, DeletionOutcome};
