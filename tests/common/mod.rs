#![allow(dead_code)]

pub mod completion {
    use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
    use std::time::Duration;

    use brrtchain::chain::Control;

    /// How long a test waits for a chain to complete
    pub const COMPLETION_TIMEOUT: Duration = Duration::from_secs(5);

    /// Terminal callback that forwards every completion into a channel
    pub fn channel() -> (impl Fn(Control) + Send + Sync + 'static, Receiver<Control>) {
        let (tx, rx) = mpsc::channel();
        let done = move |control: Control| {
            let _ = tx.send(control);
        };
        (done, rx)
    }

    /// Wait for the single completion of a chain
    pub fn wait(rx: &Receiver<Control>) -> Control {
        rx.recv_timeout(COMPLETION_TIMEOUT)
            .expect("chain did not complete in time")
    }

    /// Assert that no further completion arrives
    pub fn assert_no_more(rx: &Receiver<Control>) {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {}
            Ok(control) => panic!("unexpected extra completion: {control:?}"),
        }
    }
}

pub mod recorder {
    use std::sync::{Arc, Mutex};

    use brrtchain::chain::Handler;

    /// Shared log of which handlers ran, in order
    #[derive(Clone, Default)]
    pub struct Recorder {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, name: &str) {
            self.calls.lock().unwrap().push(name.to_string());
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        /// Normal handler that records `name` and proceeds
        pub fn proceed(&self, name: &'static str) -> Handler {
            let rec = self.clone();
            Handler::new(move |_req, _res, next| {
                rec.push(name);
                next.proceed();
            })
            .named(name)
        }

        /// Normal handler that records `name` and fails with `message`
        pub fn fail(&self, name: &'static str, message: &'static str) -> Handler {
            let rec = self.clone();
            Handler::new(move |_req, _res, next| {
                rec.push(name);
                next.fail(anyhow::anyhow!(message));
            })
            .named(name)
        }

        /// Normal handler that records `name` and aborts silently
        pub fn abort(&self, name: &'static str) -> Handler {
            let rec = self.clone();
            Handler::new(move |_req, _res, next| {
                rec.push(name);
                next.abort();
            })
            .named(name)
        }

        /// Error handler that records `name: <error>` and passes the error on
        pub fn rethrow(&self, name: &'static str) -> Handler {
            let rec = self.clone();
            Handler::error(move |err, _req, _res, next| {
                rec.push(&format!("{name}: {err}"));
                next.fail(err);
            })
            .named(name)
        }

        /// Error handler that records `name: <error>` and recovers
        pub fn recover(&self, name: &'static str) -> Handler {
            let rec = self.clone();
            Handler::error(move |err, _req, _res, next| {
                rec.push(&format!("{name}: {err}"));
                next.proceed();
            })
            .named(name)
        }
    }
}

pub mod test_server {
    use std::sync::Once;

    use brrtchain::server::Request;
    use http::Method;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }

    pub fn request(method: Method, uri: &str) -> Request {
        Request::try_new(method, uri).unwrap()
    }
}
