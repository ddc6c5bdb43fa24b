//! Object naming inside a problem's namespace.
//!
//! Inputs are stored as the zero-padded ordinal (`01`, `02`, ..., `100`) and
//! outputs as the same name with [`OUTPUT_SUFFIX`].

/// Root prefix under which every problem namespace lives.
pub const TEST_CASE_PREFIX: &str = "test_cases";

/// Suffix appended to the input name to form the output object name.
pub const OUTPUT_SUFFIX: &str = ".a";

/// Well-known object name for a custom checker's source.
pub const CHECKER_OBJECT: &str = "custom_checker.cpp";

/// Namespace holding all objects for a migrated problem.
pub fn problem_namespace(problem_id: i32) -> String {
    format!("{TEST_CASE_PREFIX}/{problem_id}")
}

/// Object name for a test input. Width 2 is a minimum; larger ordinals keep every digit.
pub fn input_object(ordinal: u32) -> String {
    format!("{ordinal:02}")
}

pub fn output_object(ordinal: u32) -> String {
    format!("{ordinal:02}{OUTPUT_SUFFIX}")
}
