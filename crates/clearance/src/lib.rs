//! Clearance approval workflow: student submission, department review, final
//! clearance by the active admissions officer, and certificate issue.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
