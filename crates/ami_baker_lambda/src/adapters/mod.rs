pub mod callback;
pub mod compute;
pub mod ec2;
pub mod http_callback;
