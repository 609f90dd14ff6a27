mod behavior;
mod bookkeeping;
mod weather;

pub use behavior::BehaviorSystem;
pub use bookkeeping::BookkeepingSystem;
pub use weather::WeatherSystem;
