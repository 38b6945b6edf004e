pub mod comments;
pub mod group_members;
pub mod groups;
pub mod lookups;
pub mod sessions;
pub mod tickets;
pub mod users;
