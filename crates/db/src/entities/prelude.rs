//! Entity re-exports.

pub use super::categories::Entity as Categories;
pub use super::families::Entity as Families;
pub use super::transactions::Entity as Transactions;
pub use super::users::Entity as Users;
