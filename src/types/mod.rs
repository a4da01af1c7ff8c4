pub mod schema;
pub mod location;
pub mod station;
pub mod window;
