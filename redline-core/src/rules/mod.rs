// Rule detection over flattened document text.
// - engine.rs: RuleEngine, compiled rule groups and the detection pass

pub mod engine;

pub use engine::{CompiledRule, RuleEngine};
