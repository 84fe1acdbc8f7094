//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod booking;
pub mod catalog;
pub mod chef;
pub mod dish;
pub mod dish_ingredient;
pub mod event;
pub mod ingredient;
pub mod payment;
pub mod system_config;

// Re-export specific types to avoid conflicts
pub use booking::{
    BookingStatus, Column as BookingColumn, Entity as Booking, Model as BookingModel,
};
pub use catalog::Catalog;
pub use chef::{Column as ChefColumn, Entity as Chef, Model as ChefModel};
pub use dish::{Column as DishColumn, Entity as Dish, Model as DishModel};
pub use dish_ingredient::{
    Column as DishIngredientColumn, Entity as DishIngredient, Model as DishIngredientModel,
};
pub use event::{Column as EventColumn, Entity as Event, Model as EventModel};
pub use ingredient::{Column as IngredientColumn, Entity as Ingredient, Model as IngredientModel};
pub use payment::{
    Column as PaymentColumn, Entity as Payment, Model as PaymentModel, PaymentStatus,
};
pub use system_config::{
    Column as SystemConfigColumn, Entity as SystemConfig, Model as SystemConfigModel,
};
