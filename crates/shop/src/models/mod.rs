//! Domain models for the shop core.
//!
//! - `product` - Catalog products and categories
//! - `cart` - Cart lines and the joined cart view
//! - `order` - Orders, order lines, receipts and purchaser identity

pub mod cart;
pub mod order;
pub mod product;

pub use cart::{CartItem, CartLine, CartView};
pub use order::{
    NewOrder, NewOrderItem, Order, OrderDetails, OrderItem, OrderLine, PlacedOrder, Purchaser,
    Receipt, SalesSummary,
};
pub use product::{Category, NewProduct, Product, ProductDetails, ProductFilter};
