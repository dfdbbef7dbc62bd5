pub mod backend;
pub mod google;
pub mod password;
pub mod principal;
pub mod role_gate;
pub mod router;
pub mod tokens;
