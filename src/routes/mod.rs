pub mod applications;
pub mod docs;
pub mod health;
pub mod stats;
