mod category;
mod image;
mod item;
mod review;
mod user;

pub use category::Category;
pub use image::Image;
pub use item::{Condition, Item, ItemDetails, ItemFields};
pub use review::{Review, ReviewInput, MAX_RATING, MIN_RATING};
pub use user::{User, UserProfile};
