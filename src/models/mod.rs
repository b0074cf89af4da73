// Wire and domain types, re-exported so callers can "use crate::models::*".
pub mod todo;
pub mod token;
pub mod user;

pub use todo::{NewTodo, Todo, TodoList, TodoPatch};
pub use token::SessionTokens;
pub use user::{Credentials, Registration, User};
