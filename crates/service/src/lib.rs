//! Service layer providing the business rules on top of the entity models.
//! - Guards every mutating operation with validation and uniqueness checks.
//! - Keeps capacity counters consistent with relationship membership.
//! - Exposes paginated query operations for the HTTP layer.

pub mod errors;
pub mod paging;

pub mod classroom_service;
pub mod course_service;
pub mod student_service;
pub mod trainer_service;

#[cfg(test)]
pub mod test_support;
