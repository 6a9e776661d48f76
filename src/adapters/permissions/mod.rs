//! Permission evaluator adapters.

mod owner_evaluator;

pub use owner_evaluator::OwnerPermissionEvaluator;
