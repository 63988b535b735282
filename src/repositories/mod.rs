pub(crate) mod answers;
pub(crate) mod assignments;
pub(crate) mod enrollments;
pub(crate) mod health;
pub(crate) mod questions;
pub(crate) mod submissions;
