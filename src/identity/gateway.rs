use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::{AuthError, Identity, IdentityChanges, IdentityService};

/// Application-facing wrapper around an [`IdentityService`].
///
/// Failures are logged here and always returned to the caller.
#[derive(Clone)]
pub struct IdentityGateway {
    service: Arc<dyn IdentityService>,
}

impl IdentityGateway {
    pub fn new(service: Arc<dyn IdentityService>) -> Self {
        Self { service }
    }

    /// Create an account; a non-blank display name is set before returning
    pub async fn register(&self, email: &str, password: &str, display_name: &str) -> Result<Identity, AuthError> {
        let identity = self
            .service
            .create_account(email, password)
            .await
            .inspect_err(|e| tracing::error!("Error registering user: {}", e))?;

        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Ok(identity);
        }

        self.service
            .set_display_name(&identity, display_name)
            .await
            .inspect_err(|e| tracing::error!("Error setting display name for {}: {}", identity.id, e))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.service
            .sign_in(email, password)
            .await
            .inspect_err(|e| tracing::warn!("Error logging in: {}", e))
    }

    pub async fn logout(&self) -> Result<(), AuthError> {
        self.service
            .sign_out()
            .await
            .inspect_err(|e| tracing::error!("Error logging out: {}", e))
    }

    /// Synchronous snapshot of the session
    pub fn current_identity(&self) -> Option<Identity> {
        self.service.current()
    }

    /// Resolve once with the provider's first state notification, then detach
    pub async fn current_identity_snapshot(&self) -> Result<Option<Identity>, AuthError> {
        let IdentityChanges { initial, receiver } = self
            .service
            .on_change()
            .await
            .inspect_err(|e| tracing::error!("Error resolving current identity: {}", e))?;
        drop(receiver);
        Ok(initial)
    }

    /// Call `callback` now with the current state, then on every sign-in and
    /// sign-out until the returned handle is unsubscribed or dropped.
    ///
    /// Notifications are delivered one at a time; a slow callback delays the
    /// ones behind it.
    pub async fn subscribe<F>(&self, mut callback: F) -> Result<Subscription, AuthError>
    where
        F: FnMut(Option<Identity>) + Send + 'static,
    {
        let IdentityChanges { initial, mut receiver } = self.service.on_change().await?;
        callback(initial);

        let service = self.service.clone();
        let task = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(next) => callback(next),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Identity subscriber lagged; {} transitions skipped", skipped);
                        // Drop the stale backlog and resume from the live state
                        receiver = receiver.resubscribe();
                        callback(service.current());
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription { task: Some(task) })
    }
}

/// Handle for an identity subscription. Dropping it also unsubscribes.
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Detach the callback. Calling again is a no-op.
    pub fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{gateway, identity};
    use async_trait::async_trait;
    use tokio::sync::broadcast;
    use std::sync::Mutex;
    use std::time::Duration;

    async fn wait_for(mut done: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !done() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn register_sets_display_name_when_given() {
        let gw = gateway();
        let identity = gw.register("ada@example.com", "secret1", " Ada ").await.unwrap();
        assert_eq!(identity.display_name.as_deref(), Some("Ada"));
        assert_eq!(gw.current_identity(), Some(identity));
    }

    #[tokio::test]
    async fn register_with_blank_display_name_leaves_it_unset() {
        let gw = gateway();
        let identity = gw.register("ada@example.com", "secret1", "   ").await.unwrap();
        assert!(identity.display_name.is_none());
        assert_eq!(identity.label(), "ada@example.com");
    }

    #[tokio::test]
    async fn register_propagates_provider_errors() {
        let gw = gateway();
        assert!(matches!(
            gw.register("not-an-email", "secret1", "Ada").await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            gw.register("ada@example.com", "123", "Ada").await,
            Err(AuthError::WeakPassword { .. })
        ));
    }

    #[tokio::test]
    async fn login_logout_and_snapshot() {
        let gw = gateway();
        gw.register("ada@example.com", "secret1", "").await.unwrap();
        gw.logout().await.unwrap();
        assert_eq!(gw.current_identity_snapshot().await.unwrap(), None);

        let identity = gw.login("ada@example.com", "secret1").await.unwrap();
        assert_eq!(gw.current_identity_snapshot().await.unwrap(), Some(identity));

        assert_eq!(
            gw.login("ada@example.com", "nope-nope").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn subscription_sees_initial_state_and_each_transition_until_unsubscribed() {
        let gw = gateway();
        let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::default();

        let sink = seen.clone();
        let mut subscription = gw
            .subscribe(move |identity| sink.lock().unwrap().push(identity.map(|i| i.email)))
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![None]);
        assert!(subscription.is_active());

        gw.register("ada@example.com", "secret1", "").await.unwrap();
        gw.logout().await.unwrap();
        wait_for(|| seen.lock().unwrap().len() == 3).await;
        assert_eq!(
            *seen.lock().unwrap(),
            vec![None, Some("ada@example.com".to_string()), None]
        );

        subscription.unsubscribe();
        subscription.unsubscribe();
        assert!(!subscription.is_active());

        gw.login("ada@example.com", "secret1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    struct BrokenProvider;

    #[async_trait]
    impl IdentityService for BrokenProvider {
        async fn create_account(&self, _: &str, _: &str) -> Result<Identity, AuthError> {
            Err(AuthError::Unavailable("offline".into()))
        }
        async fn set_display_name(&self, _: &Identity, _: &str) -> Result<Identity, AuthError> {
            Err(AuthError::Unavailable("offline".into()))
        }
        async fn sign_in(&self, _: &str, _: &str) -> Result<Identity, AuthError> {
            Err(AuthError::Unavailable("offline".into()))
        }
        async fn sign_out(&self) -> Result<(), AuthError> {
            Err(AuthError::Unavailable("offline".into()))
        }
        async fn on_change(&self) -> Result<IdentityChanges, AuthError> {
            Err(AuthError::Unavailable("offline".into()))
        }
        fn current(&self) -> Option<Identity> {
            None
        }
    }

    struct ScriptedProvider {
        transitions: broadcast::Sender<Option<Identity>>,
        current: Mutex<Option<Identity>>,
    }

    impl ScriptedProvider {
        fn emit(&self, identity: Option<Identity>) {
            *self.current.lock().unwrap() = identity.clone();
            let _ = self.transitions.send(identity);
        }
    }

    #[async_trait]
    impl IdentityService for ScriptedProvider {
        async fn create_account(&self, _: &str, _: &str) -> Result<Identity, AuthError> {
            Err(AuthError::Unavailable("scripted".into()))
        }
        async fn set_display_name(&self, _: &Identity, _: &str) -> Result<Identity, AuthError> {
            Err(AuthError::Unavailable("scripted".into()))
        }
        async fn sign_in(&self, _: &str, _: &str) -> Result<Identity, AuthError> {
            Err(AuthError::Unavailable("scripted".into()))
        }
        async fn sign_out(&self) -> Result<(), AuthError> {
            Ok(())
        }
        async fn on_change(&self) -> Result<IdentityChanges, AuthError> {
            Ok(IdentityChanges {
                initial: self.current(),
                receiver: self.transitions.subscribe(),
            })
        }
        fn current(&self) -> Option<Identity> {
            self.current.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn lagged_subscriber_resumes_at_current_state() {
        let (transitions, _) = broadcast::channel(1);
        let provider = Arc::new(ScriptedProvider {
            transitions,
            current: Mutex::new(None),
        });
        let gw = IdentityGateway::new(provider.clone());
        let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::default();

        let sink = seen.clone();
        let _subscription = gw
            .subscribe(move |identity| sink.lock().unwrap().push(identity.map(|i| i.id)))
            .await
            .unwrap();

        // The subscriber task has not run yet, so these overflow its buffer
        provider.emit(Some(identity("a", None)));
        provider.emit(None);
        provider.emit(Some(identity("c", None)));

        wait_for(|| seen.lock().unwrap().len() == 2).await;
        assert_eq!(*seen.lock().unwrap(), vec![None, Some(identity("c", None).id)]);

        provider.emit(None);
        wait_for(|| seen.lock().unwrap().len() == 3).await;
        assert_eq!(seen.lock().unwrap()[2], None);
    }

    #[tokio::test]
    async fn provider_outage_surfaces_as_error() {
        let gw = IdentityGateway::new(Arc::new(BrokenProvider));
        assert!(matches!(
            gw.current_identity_snapshot().await,
            Err(AuthError::Unavailable(_))
        ));
        assert!(matches!(gw.logout().await, Err(AuthError::Unavailable(_))));
        assert!(gw.subscribe(|_| {}).await.is_err());
    }
}
