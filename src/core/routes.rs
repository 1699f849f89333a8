//! Navigation targets.

use std::fmt;

use serde::Serialize;

/// A page the client can navigate to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum Route {
    /// Topic overview.
    Dashboard,
    /// Lesson list of one topic.
    TopicList { topic: String },
    /// A single lesson.
    Lesson { topic: String, lesson: u32 },
    /// Sign-in page, used when the auth service rejects the session.
    Login,
}

impl Route {
    /// Lesson list of a topic.
    pub fn topic_list(topic: impl Into<String>) -> Self {
        Self::TopicList {
            topic: topic.into(),
        }
    }

    /// A lesson page.
    pub fn lesson(topic: impl Into<String>, lesson: u32) -> Self {
        Self::Lesson {
            topic: topic.into(),
            lesson,
        }
    }

    /// Path of the route.
    pub fn path(&self) -> String {
        match self {
            Self::Dashboard => "/dashboard".to_string(),
            Self::TopicList { topic } => format!("/topic/{}", topic),
            Self::Lesson { topic, lesson } => format!("/topic/{}/lesson/{}", topic, lesson),
            Self::Login => "/login".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(Route::Dashboard.path(), "/dashboard");
        assert_eq!(Route::topic_list("rent").path(), "/topic/rent");
        assert_eq!(Route::lesson("rent", 3).path(), "/topic/rent/lesson/3");
        assert_eq!(Route::Login.to_string(), "/login");
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_value(Route::lesson("rent", 2)).unwrap();
        assert_eq!(json["page"], "lesson");
        assert_eq!(json["topic"], "rent");
        assert_eq!(json["lesson"], 2);
    }
}
