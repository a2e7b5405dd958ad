mod admin;

pub use admin::AdminHttpController;
