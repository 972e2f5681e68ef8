pub mod clean;
pub mod doctor;

pub use clean::CleanArgs;
