use std::fmt;

/// Logical identity of a cached resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// The full to-do list.
    Todos,
    /// One to-do by id.
    Todo(String),
    /// The current user.
    User,
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::Todos => write!(f, "todos"),
            QueryKey::Todo(id) => write!(f, "todo:{}", id),
            QueryKey::User => write!(f, "user"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        assert_eq!(QueryKey::Todos.to_string(), "todos");
        assert_eq!(QueryKey::Todo("42".into()).to_string(), "todo:42");
        assert_eq!(QueryKey::User.to_string(), "user");
    }
}
