mod filesystem;
#[cfg(test)]
mod memory;
mod records;
mod traits;

pub use filesystem::JsonLinesAuditSink;
#[cfg(test)]
pub use memory::MemoryAuditSink;
pub use records::{AuditSummary, ProgressEntry};
pub use traits::AuditSink;
