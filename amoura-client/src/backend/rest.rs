//! REST consumer of the hosted storage API.
//!
//! Every operation is a thin pass-through to the service's CRUD surface:
//! inserts POST with a representation preference, the conversation upsert
//! adds a conflict-merge preference keyed on the derived id, ordered reads
//! use the service's `order` query parameter, and updates PATCH by key.

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;
use uuid::Uuid;

use shared::config::Config;
use shared::models::{
    ClientError, ClientResult, Conversation, ConversationKey, Message, NewMessage,
    NewNotification, NewPost, NewTransaction, Notification, Post, Profile, ProfileUpdate,
    Timestamp, WalletTransaction,
};

use super::DataStore;

/// Storage collaborator backed by the hosted REST API.
#[derive(Debug, Clone)]
pub struct RestDataStore {
    http: reqwest::Client,
    base: Url,
    api_key: Option<String>,
    bearer_token: Option<String>,
}

impl RestDataStore {
    /// Builds a store from the client configuration and the caller's opaque
    /// auth token.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] if the configured backend URL does
    /// not parse.
    pub fn new(config: &Config, bearer_token: Option<String>) -> ClientResult<Self> {
        let base = Url::parse(&config.backend_url)
            .map_err(|err| ClientError::validation(format!("invalid backend URL: {err}")))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base,
            api_key: config.api_key.clone(),
            bearer_token,
        })
    }

    fn endpoint(&self, table: &str) -> ClientResult<Url> {
        self.base
            .join(&format!("rest/v1/{table}"))
            .map_err(|err| ClientError::validation(format!("invalid table path: {err}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.api_key {
            Some(key) => request.header("apikey", key),
            None => request,
        };
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> ClientResult<Vec<T>> {
        let mut url = self.endpoint(table)?;
        url.query_pairs_mut().append_pair("select", "*");
        for (name, value) in query {
            url.query_pairs_mut().append_pair(name, value);
        }

        let response = self
            .authorize(self.http.get(url))
            .send()
            .await
            .map_err(transport_error)?;
        decode_body(check_status(response)?).await
    }

    async fn insert_row<T: DeserializeOwned>(
        &self,
        table: &str,
        body: &impl Serialize,
        conflict_key: Option<&str>,
    ) -> ClientResult<T> {
        let mut url = self.endpoint(table)?;
        let mut prefer = "return=representation".to_string();
        if let Some(key) = conflict_key {
            url.query_pairs_mut().append_pair("on_conflict", key);
            prefer.push_str(",resolution=merge-duplicates");
        }

        let response = self
            .authorize(self.http.post(url))
            .header("Prefer", prefer)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        single_row(decode_body(check_status(response)?).await?, table)
    }

    async fn patch_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
        body: &impl Serialize,
    ) -> ClientResult<Vec<T>> {
        let mut url = self.endpoint(table)?;
        for (name, value) in query {
            url.query_pairs_mut().append_pair(name, value);
        }

        let response = self
            .authorize(self.http.patch(url))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        decode_body(check_status(response)?).await
    }

    async fn call_function<T: DeserializeOwned>(
        &self,
        function: &str,
        body: &impl Serialize,
    ) -> ClientResult<T> {
        let url = self
            .base
            .join(&format!("rest/v1/rpc/{function}"))
            .map_err(|err| ClientError::validation(format!("invalid function path: {err}")))?;

        let response = self
            .authorize(self.http.post(url))
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        decode_body(check_status(response)?).await
    }
}

fn transport_error(err: reqwest::Error) -> ClientError {
    // Anything that never produced a status line is worth a retry.
    ClientError::transient(format!("request failed: {err}"))
}

fn check_status(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = format!("backend returned {status}");
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        Err(ClientError::transient(message))
    } else {
        Err(ClientError::permanent(message))
    }
}

async fn decode_body<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
    response
        .json()
        .await
        .map_err(|err| ClientError::Decode {
            entity: "response",
            message: err.to_string(),
        })
}

fn single_row<T>(mut rows: Vec<T>, entity: &str) -> ClientResult<T> {
    rows.pop().ok_or(ClientError::Backend {
        message: format!("{entity} insert returned no representation"),
        transient: false,
    })
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl DataStore for RestDataStore {
    async fn fetch_profile(&self, user_id: Uuid) -> ClientResult<Profile> {
        let rows: Vec<Profile> = self
            .fetch_rows("profiles", &[("id", eq(user_id))])
            .await?;
        rows.into_iter()
            .next()
            .ok_or(ClientError::NotFound { entity: "profile" })
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> ClientResult<Profile> {
        let rows: Vec<Profile> = self
            .patch_rows("profiles", &[("id", eq(user_id))], &update)
            .await?;
        rows.into_iter()
            .next()
            .ok_or(ClientError::NotFound { entity: "profile" })
    }

    async fn list_profiles(&self) -> ClientResult<Vec<Profile>> {
        self.fetch_rows("profiles", &[("order", "created_at.desc".into())])
            .await
    }

    async fn insert_post(&self, draft: NewPost) -> ClientResult<Post> {
        let body = json!({
            "author_id": draft.author_id,
            "body": draft.body,
            "media_url": draft.media_url,
            "is_premium": draft.unlock_price_cents.is_some(),
            "unlock_price_cents": draft.unlock_price_cents,
        });
        self.insert_row("posts", &body, None).await
    }

    async fn fetch_post(&self, post_id: Uuid) -> ClientResult<Post> {
        let rows: Vec<Post> = self.fetch_rows("posts", &[("id", eq(post_id))]).await?;
        rows.into_iter()
            .next()
            .ok_or(ClientError::NotFound { entity: "post" })
    }

    async fn list_posts(&self, _viewer_id: Uuid) -> ClientResult<Vec<Post>> {
        self.fetch_rows("posts", &[("order", "created_at.desc".into())])
            .await
    }

    async fn increment_post_likes(&self, post_id: Uuid) -> ClientResult<Post> {
        // Counter bumps go through a hosted function; a client-computed
        // read-modify-write would race other likers.
        self.call_function("increment_post_likes", &json!({ "post_id": post_id }))
            .await
    }

    async fn upsert_conversation(&self, key: ConversationKey) -> ClientResult<Conversation> {
        let body = json!({
            "id": key.conversation_id(),
            "participant_a": key.participant_a,
            "participant_b": key.participant_b,
        });
        self.insert_row("conversations", &body, Some("id")).await
    }

    async fn touch_conversation(&self, conversation_id: Uuid, at: Timestamp) -> ClientResult<()> {
        let _: Vec<Conversation> = self
            .patch_rows(
                "conversations",
                &[("id", eq(conversation_id))],
                &json!({ "updated_at": at }),
            )
            .await?;
        Ok(())
    }

    async fn list_conversations(&self, user_id: Uuid) -> ClientResult<Vec<Conversation>> {
        self.fetch_rows(
            "conversations",
            &[
                ("or", format!("(participant_a.eq.{user_id},participant_b.eq.{user_id})")),
                ("order", "updated_at.desc".into()),
            ],
        )
        .await
    }

    async fn insert_message(&self, draft: NewMessage) -> ClientResult<Message> {
        self.insert_row("messages", &draft, None).await
    }

    async fn list_messages(&self, conversation_id: Uuid) -> ClientResult<Vec<Message>> {
        self.fetch_rows(
            "messages",
            &[
                ("conversation_id", eq(conversation_id)),
                ("order", "created_at.asc".into()),
            ],
        )
        .await
    }

    async fn mark_message_read(&self, message_id: Uuid) -> ClientResult<Message> {
        let rows: Vec<Message> = self
            .patch_rows(
                "messages",
                &[("id", eq(message_id))],
                &json!({ "is_read": true }),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or(ClientError::NotFound { entity: "message" })
    }

    async fn insert_notification(&self, draft: NewNotification) -> ClientResult<Notification> {
        self.insert_row("notifications", &draft, None).await
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> ClientResult<Vec<Notification>> {
        let mut query = vec![
            ("user_id", eq(user_id)),
            ("order", "created_at.desc".into()),
        ];
        if unread_only {
            query.push(("is_read", eq(false)));
        }
        self.fetch_rows("notifications", &query).await
    }

    async fn mark_notification_read(&self, notification_id: Uuid) -> ClientResult<Notification> {
        let rows: Vec<Notification> = self
            .patch_rows(
                "notifications",
                &[("id", eq(notification_id))],
                &json!({ "is_read": true }),
            )
            .await?;
        rows.into_iter().next().ok_or(ClientError::NotFound {
            entity: "notification",
        })
    }

    async fn insert_transaction(&self, draft: NewTransaction) -> ClientResult<WalletTransaction> {
        self.insert_row("wallet_transactions", &draft, None).await
    }

    async fn list_transactions(&self, user_id: Uuid) -> ClientResult<Vec<WalletTransaction>> {
        self.fetch_rows(
            "wallet_transactions",
            &[
                ("user_id", eq(user_id)),
                ("order", "created_at.asc".into()),
            ],
        )
        .await
    }
}
