pub mod interpreter;
pub mod result;
pub mod spec;

pub use interpreter::{interpret, interpret_all};
pub use result::CheckResult;
pub use spec::{CheckSpec, ScenarioSpec, ScenarioStep, TextMatch, WaitBudget};
