pub(crate) mod attendance;
pub(crate) mod events;
pub(crate) mod homework;
pub(crate) mod schools;
pub(crate) mod student_profiles;
pub(crate) mod teaching_assignments;
pub(crate) mod users;
