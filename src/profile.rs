//! User accounts: registration, credential checks, and profile
//! updates (name, email, picture, password).

pub mod manager;
pub mod storage;
