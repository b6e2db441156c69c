mod hasher;
mod token;
mod user_manager;

pub use hasher::PasswordHasher;
pub use token::{TokenError, TokenManager};
pub use user_manager::{TokenPair, UserManager};
