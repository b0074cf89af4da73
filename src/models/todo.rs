use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A to-do item owned by the authenticated user.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Envelope of `GET /api/todo/list`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TodoList {
    pub todos: Vec<Todo>,
}

/// Body of `POST /api/todo`. Fields are trimmed on construction.
#[derive(Serialize, Validate, Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    #[validate(length(min = 1, max = 100, message = "Title must be 1 to 100 characters"))]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500, message = "Description can be at most 500 characters"))]
    pub description: Option<String>,
}

impl NewTodo {
    pub fn new(title: &str, description: Option<&str>) -> Self {
        NewTodo {
            title: title.trim().to_string(),
            description: description.map(|d| d.trim().to_string()),
        }
    }
}

/// Body of `PUT /api/todo/:id`. Only the present fields are sent and validated.
#[derive(Serialize, Validate, Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100, message = "Title must be 1 to 100 characters"))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500, message = "Description can be at most 500 characters"))]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.trim().to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.trim().to_string());
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_todo_parses_wire_format() {
        let todo: Todo = serde_json::from_str(
            r#"{
                "id": "t1",
                "title": "Buy milk",
                "completed": false,
                "createdAt": "2024-05-01T10:00:00Z",
                "updatedAt": "2024-05-01T10:00:00.123Z"
            }"#,
        )
        .unwrap();
        assert_eq!(todo.id, "t1");
        assert_eq!(todo.description, None);
        assert!(!todo.completed);
    }

    #[test]
    fn test_new_todo_trims_and_validates_title() {
        let todo = NewTodo::new("   ", None);
        assert_eq!(todo.title, "");
        let errors = todo.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));

        let todo = NewTodo::new("  Buy milk ", Some(" two litres "));
        assert_eq!(todo.title, "Buy milk");
        assert_eq!(todo.description.as_deref(), Some("two litres"));
        assert!(todo.validate().is_ok());
    }

    #[test]
    fn test_new_todo_length_limits() {
        assert!(NewTodo::new(&"x".repeat(100), None).validate().is_ok());
        assert!(NewTodo::new(&"x".repeat(101), None).validate().is_err());

        let errors = NewTodo::new("ok", Some(&"d".repeat(501)))
            .validate()
            .unwrap_err();
        assert!(errors.field_errors().contains_key("description"));
    }

    fn message(errors: &validator::ValidationErrors, field: &str) -> String {
        errors.field_errors()[field][0]
            .message
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_todo_messages() {
        let errors = NewTodo::new(" ", Some(&"d".repeat(501)))
            .validate()
            .unwrap_err();
        assert_eq!(message(&errors, "title"), "Title must be 1 to 100 characters");
        assert_eq!(
            message(&errors, "description"),
            "Description can be at most 500 characters"
        );

        let errors = TodoPatch::default()
            .title(&"x".repeat(101))
            .validate()
            .unwrap_err();
        assert_eq!(message(&errors, "title"), "Title must be 1 to 100 characters");
    }

    #[test]
    fn test_patch_sends_only_present_fields() {
        let patch = TodoPatch::default().completed(true);
        assert!(patch.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({"completed": true})
        );

        assert!(TodoPatch::default().title(" ").validate().is_err());
    }
}
