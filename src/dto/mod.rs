pub mod events;
pub mod products;
