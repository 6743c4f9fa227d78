mod users;

pub use users::cmd_list_users;
