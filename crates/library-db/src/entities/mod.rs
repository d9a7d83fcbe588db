//! Database entities

pub mod book;
pub mod user;

pub use book::Entity as Book;
pub use user::Entity as User;

pub mod prelude {
    pub use super::book::Entity as Book;
    pub use super::user::Entity as User;
}
