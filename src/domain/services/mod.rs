mod orchestrator;
mod sync;
#[cfg(test)]
pub mod test_support;

pub use orchestrator::*;
pub use sync::*;
