// CLI command implementations

pub mod harvest;
