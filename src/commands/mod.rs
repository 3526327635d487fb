pub mod detect;
pub mod extract;
pub mod inventory;
pub mod status;
