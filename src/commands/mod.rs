pub mod credentials;
pub mod grant_admin;
