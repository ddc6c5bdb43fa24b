pub mod problem;
pub mod problem_tag;
pub mod tag;
pub mod test_case;
