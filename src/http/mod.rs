//! HTTP-specific types that are shared between services.

pub mod problem_details;
pub use problem_details::ProblemDetails;
