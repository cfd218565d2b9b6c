//! Integration tests for the users API endpoints

mod test_utils;

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::util::ServiceExt;

    use outline::chat::{Conversation, save_conversation};
    use outline::openai::{Message, Role};

    use crate::test_utils::{body_to_string, test_app};

    fn conversation(id: &str, created_at: i64) -> Conversation {
        Conversation::from_completion(
            id,
            "user-1",
            vec![
                Message::new(Role::System, "Persona"),
                Message::new(Role::User, id),
            ],
            "Reply",
            created_at,
        )
    }

    async fn get(app: axum::Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        (status, body_to_string(response.into_body()).await)
    }

    /// Tests a user with no history gets an empty list
    #[tokio::test]
    async fn it_lists_no_chats_for_new_user() {
        let (app, _store) = test_app("http://127.0.0.1:9");

        let (status, body) = get(app, "/api/users/nobody/chats").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"chats":[]}"#);
    }

    /// Tests chats are listed newest first
    #[tokio::test]
    async fn it_lists_chats_newest_first() {
        let (app, store) = test_app("http://127.0.0.1:9");
        for (id, created_at) in [("old", 1), ("new", 3), ("mid", 2)] {
            save_conversation(store.as_ref(), &conversation(id, created_at))
                .await
                .unwrap();
        }

        let (status, body) = get(app, "/api/users/user-1/chats").await;
        assert_eq!(status, StatusCode::OK);

        let body: Value = serde_json::from_str(&body).unwrap();
        let ids: Vec<&str> = body["chats"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
        assert_eq!(body["chats"][0]["userId"], "user-1");
    }

    /// Tests the limit parameter caps the number of chats
    #[tokio::test]
    async fn it_accepts_limit_parameter() {
        let (app, store) = test_app("http://127.0.0.1:9");
        for (id, created_at) in [("a", 1), ("b", 2), ("c", 3)] {
            save_conversation(store.as_ref(), &conversation(id, created_at))
                .await
                .unwrap();
        }

        let (status, body) = get(app, "/api/users/user-1/chats?limit=2").await;
        assert_eq!(status, StatusCode::OK);

        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["chats"].as_array().unwrap().len(), 2);
        assert_eq!(body["chats"][0]["id"], "c");
    }

    /// Tests an invalid limit returns 400
    #[tokio::test]
    async fn it_returns_400_for_invalid_limit() {
        let (app, _store) = test_app("http://127.0.0.1:9");

        let (status, _body) = get(app, "/api/users/user-1/chats?limit=lots").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
