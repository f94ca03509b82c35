//! # Mock Framework
//!
//! Utilities for testing clients in isolation.
//!
//! Use [`create_mock_client`] to get a client and a receiver.
//! Then use helpers like [`expect_create_many`] or [`expect_action`] to assert behavior.

use tokio::sync::{mpsc, oneshot};

use crate::actor_framework::{Entity, ResourceClient, ResourceRequest};

pub type Responder<R, T> = oneshot::Sender<Result<R, <T as Entity>::Error>>;

/// Creates a mock client and a receiver for asserting requests.
///
/// # Testing Strategy
/// A client test does not need a running `ResourceActor`. The mock client
/// sends its requests to a channel the test owns; the test inspects each
/// request and answers it, so successes and failures are deterministic.
pub fn create_mock_client<T: Entity>(buffer_size: usize) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Helper to verify that the next message is a Create request
pub async fn expect_create<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::CreateParams, Responder<T::Id, T>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create { params, respond_to }) => Some((params, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a CreateMany request
pub async fn expect_create_many<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(Vec<T::CreateParams>, Responder<Vec<T>, T>)> {
    match receiver.recv().await {
        Some(ResourceRequest::CreateMany { params, respond_to }) => Some((params, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, Responder<Option<T>, T>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a List request
pub async fn expect_list<T: Entity>(receiver: &mut mpsc::Receiver<ResourceRequest<T>>) -> Option<Responder<Vec<T>, T>> {
    match receiver.recv().await {
        Some(ResourceRequest::List { respond_to }) => Some(respond_to),
        _ => None,
    }
}

/// Helper to verify that the next message is an Action request
pub async fn expect_action<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, T::Action, Responder<T::ActionResult, T>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action { id, action, respond_to }) => Some((id, action, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Delete request
pub async fn expect_delete<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, Responder<(), T>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Delete { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a DeleteMany request
pub async fn expect_delete_many<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(Vec<T::Id>, Responder<usize, T>)> {
    match receiver.recv().await {
        Some(ResourceRequest::DeleteMany { ids, respond_to }) => Some((ids, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart_actor::CartError;
    use crate::domain::{CartEntry, Category, Product};

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client::<CartEntry>(10);

        let create_task = tokio::spawn(async move {
            client
                .create(Product::new(1, "Cement", 500.0, Category::Material))
                .await
        });

        let (payload, responder) = expect_create(&mut receiver).await.expect("Expected Create request");
        assert_eq!(payload.name, "Cement");
        responder.send(Ok("line_1".to_string())).unwrap();

        let result = create_task.await.unwrap();
        assert_eq!(result, Ok("line_1".to_string()));
    }

    #[tokio::test]
    async fn test_mock_client_error_passthrough() {
        let (client, mut receiver) = create_mock_client::<CartEntry>(10);

        let delete_task = tokio::spawn(async move { client.delete("line_9".to_string()).await });

        let (id, responder) = expect_delete(&mut receiver).await.expect("Expected Delete request");
        responder.send(Err(CartError::LineNotFound(id))).unwrap();

        assert_eq!(
            delete_task.await.unwrap(),
            Err(CartError::LineNotFound("line_9".to_string()))
        );
    }
}
