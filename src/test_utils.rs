use crate::models::domain::{Question, QuestionKind, Quiz, User};

#[cfg(test)]
pub mod fixtures {
    use super::*;

    /// Creates a standard registered test user
    pub fn test_user() -> User {
        User::new(
            "Jane Doe",
            "jane@example.com",
            "(123) 456-7890",
            "AB12CD34-XY98ZW76",
        )
    }

    /// Creates a quiz with `question_count` required yes/no questions,
    /// ids "q-1".."q-N"
    pub fn test_quiz(id: &str, question_count: usize) -> Quiz {
        let questions = (1..=question_count)
            .map(|n| Question {
                id: format!("q-{}", n),
                prompt: format!("Question {}", n),
                required: true,
                kind: QuestionKind::YesNo,
            })
            .collect();

        Quiz {
            id: id.to_string(),
            title: format!("Quiz {}", id),
            description: "A test quiz".to_string(),
            questions,
            estimated_time: 10,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[test]
    fn test_fixtures_test_user() {
        let user = test_user();
        assert_eq!(user.email, "jane@example.com");
        assert!(!user.resume_token.is_empty());
    }

    #[test]
    fn test_fixtures_test_quiz() {
        let quiz = test_quiz("quiz-1", 3);
        assert_eq!(quiz.total_questions(), 3);
        assert_eq!(quiz.questions[0].id, "q-1");
        assert_eq!(quiz.questions[2].id, "q-3");
        assert!(quiz.questions.iter().all(|q| q.required));
    }
}
