mod assignments;
pub(crate) mod errors;
pub(crate) mod extract;
pub(crate) mod guards;
mod handlers;
pub(crate) mod router;
mod student;
