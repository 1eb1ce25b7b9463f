//! Scoped use of a client: open, run, always tear down.

use futures::future::BoxFuture;

use crate::client::ConversationClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::transport::Transport;

/// Build a client on `transport`, hand it to `body`, then shut it down
/// whether `body` succeeded or not. The body's result is returned as is.
///
/// ```no_run
/// # async fn demo() -> parlai_client::Result<()> {
/// use parlai_client::{with_client_on, ClientConfig, ScriptedTransport};
///
/// let transport = ScriptedTransport::new().reply("hello");
/// let reply = with_client_on(transport, ClientConfig::new("ws://chat"), |client| {
///     Box::pin(async move { client.ask("hi").await })
/// })
/// .await?;
/// assert_eq!(reply, "hello");
/// # Ok(())
/// # }
/// ```
pub async fn with_client_on<T, R, F>(transport: T, config: ClientConfig, body: F) -> Result<R>
where
    T: Transport,
    F: for<'c> FnOnce(&'c mut ConversationClient<T>) -> BoxFuture<'c, Result<R>>,
{
    let mut client = ConversationClient::new(config, transport);
    let outcome = body(&mut client).await;
    client.shutdown().await;
    outcome
}

/// [`with_client_on`] over a websocket transport.
#[cfg(feature = "websocket")]
pub async fn with_client<R, F>(config: ClientConfig, body: F) -> Result<R>
where
    F: for<'c> FnOnce(
        &'c mut ConversationClient<crate::websocket::WebSocketTransport>,
    ) -> BoxFuture<'c, Result<R>>,
{
    with_client_on(crate::websocket::WebSocketTransport::new(), config, body).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::transport::ScriptedTransport;

    #[tokio::test]
    async fn tears_down_after_success() {
        let transport = ScriptedTransport::new().reply("hello");
        let reply = with_client_on(transport.clone(), ClientConfig::new("ws://chat"), |client| {
            Box::pin(async move { client.ask("hi").await })
        })
        .await
        .unwrap();

        assert_eq!(reply, "hello");
        assert_eq!(transport.closes(), 1);
    }

    #[tokio::test]
    async fn tears_down_after_error() {
        let transport = ScriptedTransport::new().reply("hello");
        let result: Result<()> =
            with_client_on(transport.clone(), ClientConfig::new("ws://chat"), |client| {
                Box::pin(async move {
                    client.ask("hi").await?;
                    Err::<(), _>(ClientError::Protocol("caller gave up".into()))
                })
            })
            .await;

        assert!(matches!(result, Err(ClientError::Protocol(_))));
        assert_eq!(transport.closes(), 1);
    }
}
