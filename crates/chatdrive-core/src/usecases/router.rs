//! Event router and command dispatcher
//!
//! Handles one webhook event at a time. Every failure is translated into a
//! best-effort reply (or a log line) here; nothing escapes
//! [`EventRouter::dispatch`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{ChatEvent, ConnectionError, EventSource, MessageContent, UserIdentity};
use crate::ports::{IChatMessenger, IMessageContentSource, OutgoingMessage};
use crate::usecases::authorize::AuthorizationFlow;
use crate::usecases::classify::{FailureClass, IFailureClassifier};
use crate::usecases::hooks::TransitionHooks;
use crate::usecases::lifecycle::CredentialLifecycle;
use crate::usecases::replies::{self, Command};
use crate::usecases::upload::UploadOrchestrator;

/// Routes chat events to the use cases
pub struct EventRouter {
    flow: Arc<AuthorizationFlow>,
    lifecycle: Arc<CredentialLifecycle>,
    uploads: Arc<UploadOrchestrator>,
    messenger: Arc<dyn IChatMessenger>,
    content: Arc<dyn IMessageContentSource>,
    classifier: Arc<dyn IFailureClassifier>,
    follow_hooks: TransitionHooks,
}

impl EventRouter {
    /// Creates a new EventRouter
    ///
    /// # Arguments
    ///
    /// * `follow_hooks` - Run with the user's current state on a follow event
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        flow: Arc<AuthorizationFlow>,
        lifecycle: Arc<CredentialLifecycle>,
        uploads: Arc<UploadOrchestrator>,
        messenger: Arc<dyn IChatMessenger>,
        content: Arc<dyn IMessageContentSource>,
        classifier: Arc<dyn IFailureClassifier>,
        follow_hooks: TransitionHooks,
    ) -> Self {
        Self {
            flow,
            lifecycle,
            uploads,
            messenger,
            content,
            classifier,
            follow_hooks,
        }
    }

    /// Handles `events` in delivery order
    pub async fn dispatch_all(&self, events: &[ChatEvent]) {
        for event in events {
            self.dispatch(event).await;
        }
    }

    /// Handles one event
    pub async fn dispatch(&self, event: &ChatEvent) {
        match event {
            ChatEvent::Message {
                reply_token,
                source,
                message,
            } => {
                let Some(user) = acting_user(event.kind(), source) else {
                    return;
                };
                self.on_message(&user, reply_token, message).await;
            }
            ChatEvent::Follow { source, .. } => {
                let Some(user) = acting_user(event.kind(), source) else {
                    return;
                };
                info!(user = %user, "Follow event");
                match self.lifecycle.connection_state(&user).await {
                    Ok(state) => self.follow_hooks.run(&user, state).await,
                    Err(e) => warn!(user = %user, error = %e, "Could not determine connection state"),
                }
            }
            ChatEvent::MemberJoined { joined, .. } => {
                info!(count = joined.members.len(), "Members joined");
            }
            ChatEvent::MemberLeft { left, .. } => {
                info!(count = left.members.len(), "Members left");
            }
            ChatEvent::Beacon { source, beacon, .. } => {
                info!(
                    user = ?source.user_identity(),
                    hwid = %beacon.hwid,
                    kind = %beacon.kind,
                    "Beacon event"
                );
            }
            ChatEvent::Unfollow { source }
            | ChatEvent::Join { source, .. }
            | ChatEvent::Leave { source }
            | ChatEvent::Postback { source, .. } => {
                info!(kind = event.kind(), user = ?source.user_identity(), "Event ignored");
            }
            ChatEvent::Unsupported => debug!("Unsupported event type ignored"),
        }
    }

    async fn on_message(&self, user: &UserIdentity, reply_token: &str, message: &MessageContent) {
        match message {
            MessageContent::Text { text, .. } => self.on_text(user, reply_token, text).await,
            MessageContent::Image { id }
            | MessageContent::Video { id }
            | MessageContent::Audio { id }
            | MessageContent::File { id, .. } => {
                let Some(filename) = message.upload_file_name() else {
                    return;
                };
                let reply = self.upload_media(user, id, &filename).await;
                self.reply(reply_token, reply).await;
            }
            MessageContent::Sticker {
                sticker_id,
                sticker_resource_type,
                ..
            } => {
                let reply = replies::sticker(sticker_id, sticker_resource_type.as_deref());
                self.reply(reply_token, reply).await;
            }
            MessageContent::Location { id, .. } => {
                debug!(user = %user, message_id = %id, "Location message ignored");
            }
            MessageContent::Unsupported => {
                debug!(user = %user, "Unsupported message type ignored");
            }
        }
    }

    async fn on_text(&self, user: &UserIdentity, reply_token: &str, text: &str) {
        let command = Command::parse(text);
        debug!(user = %user, ?command, "Text message");

        let reply = match command {
            Command::ConnectDrive => match self.flow.begin(user).await {
                Ok(url) => replies::authorization_link(&url),
                Err(e) => {
                    warn!(user = %user, error = %e, "Failed to begin authorization");
                    OutgoingMessage::text(replies::CONNECT_FAILED)
                }
            },
            Command::RecentFiles => match self.uploads.recent_files(user).await {
                Ok(files) => replies::recent_files(files),
                Err(e) => self.recovery(user, &e, replies::RECENT_FILES_FAILED),
            },
            Command::DisconnectDrive => match self.lifecycle.revoke(user).await {
                Ok(()) => OutgoingMessage::text(replies::DISCONNECTED),
                Err(ConnectionError::NotFound) => OutgoingMessage::text(replies::NOT_CONNECTED),
                Err(e) => {
                    warn!(user = %user, error = %e, "Failed to disconnect");
                    OutgoingMessage::text(replies::DISCONNECT_FAILED)
                }
            },
            Command::Reconnect => match self.lifecycle.reconnect(user).await {
                Ok(url) => replies::reauthorization_link(&url),
                Err(e) => {
                    warn!(user = %user, error = %e, "Failed to begin reauthorization");
                    OutgoingMessage::text(replies::RECONNECT_FAILED)
                }
            },
            Command::Echo(text) => OutgoingMessage::text(text),
        };

        self.reply(reply_token, reply).await;
    }

    /// Session first, so an unconnected user costs no content download
    async fn upload_media(
        &self,
        user: &UserIdentity,
        message_id: &str,
        filename: &str,
    ) -> OutgoingMessage {
        let session = match self.uploads.open_session(user).await {
            Ok(session) => session,
            Err(e) => return self.recovery(user, &e, replies::UPLOAD_FAILED),
        };

        let content = match self.content.fetch_content(message_id).await {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    user = %user,
                    message_id = %message_id,
                    error = format!("{e:#}"),
                    "Failed to fetch message content"
                );
                return OutgoingMessage::text(replies::UPLOAD_FAILED);
            }
        };

        match self.uploads.upload(session.as_ref(), content, filename).await {
            Ok(result) => replies::upload_succeeded(&result.view_url),
            Err(e) => self.recovery(user, &e, replies::UPLOAD_FAILED),
        }
    }

    /// Picks the recovery reply for a failed operation
    fn recovery(&self, user: &UserIdentity, err: &ConnectionError, fallback: &str) -> OutgoingMessage {
        match self.classifier.classify(err) {
            FailureClass::NoCredential => replies::connect_prompt(),
            FailureClass::AuthRejected => {
                info!(user = %user, error = %err, "Storage authorization rejected");
                replies::reconnect_prompt()
            }
            FailureClass::Other => {
                warn!(user = %user, error = %err, "Storage operation failed");
                OutgoingMessage::text(fallback)
            }
        }
    }

    async fn reply(&self, reply_token: &str, message: OutgoingMessage) {
        if reply_token.is_empty() {
            debug!("No reply token, reply dropped");
            return;
        }
        if let Err(e) = self.messenger.reply(reply_token, &[message]).await {
            warn!(error = format!("{e:#}"), "Failed to send reply");
        }
    }
}

fn acting_user(kind: &str, source: &EventSource) -> Option<UserIdentity> {
    let user = source.user_identity();
    if user.is_none() {
        info!(kind, ?source, "Event has no user id, skipped");
    }
    user
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Credential, ProviderError};
    use crate::usecases::classify::ProviderFailureClassifier;
    use crate::usecases::hooks::UiStateSyncHook;
    use crate::usecases::test_support::{
        user, MockContentSource, MockCredentialStore, MockDrive, MockIdentityProvider,
        MockMessenger, MockSessionFactory, MockStateStore,
    };

    struct Fixture {
        drive: Arc<MockDrive>,
        credentials: Arc<MockCredentialStore>,
        states: Arc<MockStateStore>,
        identity: Arc<MockIdentityProvider>,
        messenger: Arc<MockMessenger>,
        content: Arc<MockContentSource>,
        router: EventRouter,
    }

    fn fixture(connected: bool) -> Fixture {
        let drive = Arc::new(MockDrive::default());
        let credentials = Arc::new(if connected {
            MockCredentialStore::with(&user("U1"), Credential::bearer("at").with_refresh_token("rt"))
        } else {
            MockCredentialStore::default()
        });
        let states = Arc::new(MockStateStore::default());
        let identity = Arc::new(MockIdentityProvider::default());
        let messenger = Arc::new(MockMessenger::default());
        let content = Arc::new(MockContentSource::default());

        let hooks = TransitionHooks::new().with(Arc::new(UiStateSyncHook::new(
            messenger.clone(),
            Some("menu-connected".to_string()),
            Some("menu-disconnected".to_string()),
        )));
        let flow = Arc::new(AuthorizationFlow::new(
            identity.clone(),
            credentials.clone(),
            states.clone(),
            hooks.clone(),
        ));
        let lifecycle = Arc::new(CredentialLifecycle::new(
            identity.clone(),
            credentials.clone(),
            flow.clone(),
            hooks.clone(),
        ));
        let uploads = Arc::new(UploadOrchestrator::new(
            credentials.clone(),
            Arc::new(MockSessionFactory::new(drive.clone())),
            "AppRoot",
        ));
        let router = EventRouter::new(
            flow,
            lifecycle,
            uploads,
            messenger.clone(),
            content.clone(),
            Arc::new(ProviderFailureClassifier),
            hooks,
        );

        Fixture {
            drive,
            credentials,
            states,
            identity,
            messenger,
            content,
            router,
        }
    }

    fn text_event(text: &str) -> ChatEvent {
        message_event(MessageContent::Text {
            id: "m1".to_string(),
            text: text.to_string(),
        })
    }

    fn message_event(message: MessageContent) -> ChatEvent {
        ChatEvent::Message {
            reply_token: "rt".to_string(),
            source: EventSource::User {
                user_id: "U1".to_string(),
            },
            message,
        }
    }

    fn image() -> ChatEvent {
        message_event(MessageContent::Image {
            id: "111".to_string(),
        })
    }

    #[tokio::test]
    async fn test_connect_replies_with_link() {
        let f = fixture(false);

        f.router.dispatch(&text_event("/connect_drive")).await;

        let nonce = f.states.only_nonce();
        let text = f.messenger.only_reply_text();
        assert!(text.starts_with("Please authorize this app"));
        assert!(text.contains(nonce.as_str()));
    }

    #[tokio::test]
    async fn test_connect_failure_replies_generic() {
        let f = fixture(false);
        *f.states.fail_put.lock().unwrap() = true;

        f.router.dispatch(&text_event("/connect_drive")).await;

        assert_eq!(f.messenger.only_reply_text(), replies::CONNECT_FAILED);
    }

    #[tokio::test]
    async fn test_recent_files_without_credential_prompts_connect() {
        let f = fixture(false);

        f.router.dispatch(&text_event("/recent_files")).await;

        assert_eq!(f.messenger.only_reply(), vec![replies::connect_prompt()]);
        assert_eq!(f.drive.opened(), 0);
    }

    #[tokio::test]
    async fn test_recent_files_empty_state() {
        let f = fixture(true);
        f.drive.add_folder("approot", "AppRoot", "root");

        f.router.dispatch(&text_event("/recent_files")).await;

        assert_eq!(
            f.messenger.only_reply(),
            vec![OutgoingMessage::text(replies::EMPTY_RECENT_FILES)]
        );
    }

    #[tokio::test]
    async fn test_recent_files_carousel() {
        let f = fixture(true);
        f.drive.add_folder("approot", "AppRoot", "root");
        f.drive.add_folder("m06", "2025-06", "approot");
        f.drive.add_file("f1", "line-bot-upload-1.jpg", "m06");

        f.router.dispatch(&text_event("/recent_files")).await;

        match f.messenger.only_reply().as_slice() {
            [OutgoingMessage::FileCarousel { files, .. }] => {
                assert_eq!(files.len(), 1);
                assert_eq!(files[0].id, "f1");
            }
            other => panic!("expected a carousel, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_recent_files_auth_rejected_prompts_reconnect() {
        let f = fixture(true);
        *f.drive.find_error.lock().unwrap() = Some(ProviderError::Http {
            status: 401,
            message: "Invalid Credentials".to_string(),
        });

        f.router.dispatch(&text_event("/recent_files")).await;

        assert_eq!(f.messenger.only_reply(), vec![replies::reconnect_prompt()]);
    }

    #[tokio::test]
    async fn test_disconnect() {
        let f = fixture(true);

        f.router.dispatch(&text_event("/disconnect_drive")).await;

        assert_eq!(f.messenger.only_reply_text(), replies::DISCONNECTED);
        assert_eq!(f.credentials.count(), 0);
        assert_eq!(f.identity.revoked(), vec!["rt".to_string()]);
        assert_eq!(
            f.messenger.links(),
            vec![(user("U1"), "menu-disconnected".to_string())]
        );
    }

    #[tokio::test]
    async fn test_disconnect_when_not_connected() {
        let f = fixture(false);

        f.router.dispatch(&text_event("/disconnect_drive")).await;

        assert_eq!(f.messenger.only_reply_text(), replies::NOT_CONNECTED);
        assert!(f.messenger.links().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_local_failure_replies_generic() {
        let f = fixture(true);
        *f.credentials.fail_delete.lock().unwrap() = true;

        f.router.dispatch(&text_event("/disconnect_drive")).await;

        assert_eq!(f.messenger.only_reply_text(), replies::DISCONNECT_FAILED);
    }

    #[tokio::test]
    async fn test_reconnect() {
        let f = fixture(true);

        f.router.dispatch(&text_event("/reconnect")).await;

        assert!(f
            .messenger
            .only_reply_text()
            .starts_with("Please re-authorize this app"));
        assert_eq!(f.credentials.count(), 0);
        assert_eq!(f.states.count(), 1);
    }

    #[tokio::test]
    async fn test_other_text_is_echoed() {
        let f = fixture(false);

        f.router.dispatch(&text_event("hello there")).await;

        assert_eq!(f.messenger.only_reply_text(), "hello there");
    }

    #[tokio::test]
    async fn test_media_upload_success() {
        let f = fixture(true);

        f.router.dispatch(&image()).await;

        assert_eq!(f.content.fetched(), vec!["111".to_string()]);
        assert_eq!(f.drive.uploads(), 1);
        let files = f.drive.files.lock().unwrap().clone();
        assert_eq!(files[0].0.name, "line-bot-upload-111.jpg");
        match f.messenger.only_reply().as_slice() {
            [OutgoingMessage::Text {
                text,
                quick_replies,
            }] => {
                assert!(text.starts_with("File uploaded to Google Drive: "));
                assert!(text.contains("file-1"));
                assert_eq!(quick_replies.len(), 2);
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_file_message_keeps_original_name() {
        let f = fixture(true);

        f.router
            .dispatch(&message_event(MessageContent::File {
                id: "444".to_string(),
                file_name: "report.pdf".to_string(),
                file_size: Some(10),
            }))
            .await;

        let files = f.drive.files.lock().unwrap().clone();
        assert_eq!(files[0].0.name, "444-report.pdf");
    }

    #[tokio::test]
    async fn test_media_without_credential_skips_download() {
        let f = fixture(false);

        f.router.dispatch(&image()).await;

        assert_eq!(f.messenger.only_reply(), vec![replies::connect_prompt()]);
        assert!(f.content.fetched().is_empty());
        assert_eq!(f.drive.opened(), 0);
    }

    #[tokio::test]
    async fn test_media_auth_rejected_prompts_reconnect() {
        let f = fixture(true);
        *f.drive.upload_error.lock().unwrap() = Some(ProviderError::Http {
            status: 403,
            message: "forbidden".to_string(),
        });

        f.router.dispatch(&image()).await;

        assert_eq!(f.messenger.only_reply(), vec![replies::reconnect_prompt()]);
    }

    #[tokio::test]
    async fn test_media_refresh_rejected_prompts_reconnect() {
        let f = fixture(true);
        *f.drive.session_error.lock().unwrap() =
            Some(ProviderError::InvalidGrant("Token has been expired or revoked.".to_string()));

        f.router.dispatch(&image()).await;

        assert_eq!(f.messenger.only_reply(), vec![replies::reconnect_prompt()]);
        assert!(f.content.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_media_other_failure_replies_generic() {
        let f = fixture(true);
        *f.drive.upload_error.lock().unwrap() = Some(ProviderError::Http {
            status: 500,
            message: "backendError".to_string(),
        });

        f.router.dispatch(&image()).await;

        assert_eq!(f.messenger.only_reply_text(), replies::UPLOAD_FAILED);
    }

    #[tokio::test]
    async fn test_content_fetch_failure_replies_generic() {
        let f = fixture(true);
        *f.content.fail.lock().unwrap() = true;

        f.router.dispatch(&image()).await;

        assert_eq!(f.messenger.only_reply_text(), replies::UPLOAD_FAILED);
        assert_eq!(f.drive.uploads(), 0);
    }

    #[tokio::test]
    async fn test_sticker_reply_and_location_ignored() {
        let f = fixture(false);

        f.router
            .dispatch(&message_event(MessageContent::Sticker {
                id: "5".to_string(),
                package_id: "1".to_string(),
                sticker_id: "2".to_string(),
                sticker_resource_type: Some("ANIMATION".to_string()),
            }))
            .await;
        f.router
            .dispatch(&message_event(MessageContent::Location {
                id: "6".to_string(),
                title: None,
                address: None,
                latitude: 25.0,
                longitude: 121.5,
            }))
            .await;

        assert_eq!(
            f.messenger.only_reply_text(),
            "Sticker message: sticker id is 2, stickerResourceType is ANIMATION"
        );
    }

    #[tokio::test]
    async fn test_follow_links_affordance_for_current_state() {
        let f = fixture(false);
        let follow = ChatEvent::Follow {
            reply_token: "rt".to_string(),
            source: EventSource::User {
                user_id: "U1".to_string(),
            },
        };

        f.router.dispatch(&follow).await;

        assert_eq!(
            f.messenger.links(),
            vec![(user("U1"), "menu-disconnected".to_string())]
        );
        assert!(f.messenger.replies().is_empty());
    }

    #[tokio::test]
    async fn test_event_without_user_is_skipped() {
        let f = fixture(false);
        let event = ChatEvent::Message {
            reply_token: "rt".to_string(),
            source: EventSource::Group {
                group_id: "C1".to_string(),
                user_id: None,
            },
            message: MessageContent::Text {
                id: "m".to_string(),
                text: "/connect_drive".to_string(),
            },
        };

        f.router.dispatch(&event).await;

        assert!(f.messenger.replies().is_empty());
        assert_eq!(f.states.count(), 0);
    }

    #[tokio::test]
    async fn test_reply_failures_do_not_stop_batch() {
        let f = fixture(false);
        *f.messenger.fail_reply.lock().unwrap() = true;

        f.router
            .dispatch_all(&[text_event("one"), ChatEvent::Unsupported, text_event("two")])
            .await;

        assert_eq!(f.messenger.replies().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_reply_token_sends_nothing() {
        let f = fixture(false);
        let event = ChatEvent::Message {
            reply_token: String::new(),
            source: EventSource::User {
                user_id: "U1".to_string(),
            },
            message: MessageContent::Text {
                id: "m".to_string(),
                text: "hi".to_string(),
            },
        };

        f.router.dispatch(&event).await;

        assert!(f.messenger.replies().is_empty());
    }
}
