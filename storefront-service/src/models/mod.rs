pub mod cancellation;
pub mod cart;
pub mod order;
pub mod product;
pub mod transaction;
pub mod user;
pub mod wishlist;

pub use cancellation::OrderCancellation;
pub use cart::CartItem;
pub use order::{Order, OrderItem, OrderStatus, ShippingAddress, StatusHistoryEntry};
pub use product::Product;
pub use transaction::{PaymentStatus, PaymentTransaction};
pub use user::{Role, User};
pub use wishlist::WishlistItem;
