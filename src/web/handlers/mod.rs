pub mod auth;
pub mod projects;
pub mod test_cases;
pub mod workflows;
