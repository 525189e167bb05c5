//! Notification dispatch seam
//!
//! Template rendering and delivery belong to an external collaborator. The
//! core only hands over (template, recipient, variables) after a commit has
//! succeeded, on a detached thread, so a slow or failing channel can never
//! block or roll back a transition. Failures are warned about and dropped.

use std::sync::Arc;

pub type Variables = Vec<(String, String)>;

pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, template: &str, recipient: &str, variables: &Variables)
    -> anyhow::Result<()>;
}

/// Dispatcher that drops everything. Default for tests and the demo.
pub struct NoopDispatcher;

impl NotificationDispatcher for NoopDispatcher {
    fn dispatch(&self, _: &str, _: &str, _: &Variables) -> anyhow::Result<()> {
        Ok(())
    }
}

// fire-and-forget; the commit already succeeded by the time this runs
pub(crate) fn dispatch_detached(
    dispatcher: Arc<dyn NotificationDispatcher>,
    template: &'static str,
    recipient: String,
    variables: Variables,
) {
    std::thread::spawn(move || {
        if let Err(err) = dispatcher.dispatch(template, &recipient, &variables) {
            log::warn!("notification `{template}` to `{recipient}` failed: {err:#}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::mpsc::Sender;

    struct ChannelDispatcher(Mutex<Sender<(String, String)>>);

    impl NotificationDispatcher for ChannelDispatcher {
        fn dispatch(&self, template: &str, recipient: &str, _: &Variables) -> anyhow::Result<()> {
            self.0
                .lock()
                .unwrap()
                .send((template.to_string(), recipient.to_string()))?;
            Ok(())
        }
    }

    #[test]
    fn detached_dispatch_reaches_the_collaborator() {
        let (tx, rx) = std::sync::mpsc::channel();
        let dispatcher = Arc::new(ChannelDispatcher(Mutex::new(tx)));

        dispatch_detached(
            dispatcher,
            "offer_accepted",
            "jo@example.com".into(),
            vec![("address".into(), "7 Quay Street".into())],
        );

        let (template, recipient) = rx
            .recv_timeout(std::time::Duration::from_secs(2))
            .expect("dispatch never arrived");
        assert_eq!(template, "offer_accepted");
        assert_eq!(recipient, "jo@example.com");
    }
}
