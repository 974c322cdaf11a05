// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0

//! Test utilities for integration tests

use std::sync::Arc;

use parking_lot::Mutex;

/// Initialization utilities for tests
pub mod init {
    use super::*;
    use vartree::{TreeConfig, TreeController};

    use crate::test_utils::mock::{MockBackend, MockFrame};

    /// Initialize test logging
    pub fn init_test_environment() {
        vartree_common::logging::ensure_test_logging(None);
    }

    /// A controller over `backend` with default settings and no frame
    pub fn controller(backend: &Arc<MockBackend>) -> TreeController<MockBackend> {
        controller_with_config(backend, TreeConfig::default())
    }

    /// A controller over `backend` with the given settings and no frame
    pub fn controller_with_config(
        backend: &Arc<MockBackend>,
        config: TreeConfig,
    ) -> TreeController<MockBackend> {
        init_test_environment();
        TreeController::new(Arc::clone(backend), config)
    }

    /// A controller over `backend` evaluating in `frame`
    pub fn controller_with_frame(
        backend: &Arc<MockBackend>,
        frame: MockFrame,
    ) -> (TreeController<MockBackend>, Arc<MockFrame>) {
        let controller = controller(backend);
        let frame = Arc::new(frame);
        controller.set_frame(Some(Arc::clone(&frame)));
        (controller, frame)
    }
}

/// Logging and warning capture utilities for tests
pub mod logging {
    use super::*;
    use tracing::{subscriber::DefaultGuard, Level};
    use tracing_subscriber::layer::SubscriberExt;

    /// A tracing layer that captures warnings and errors
    #[derive(Clone, Default)]
    pub struct WarningCapture {
        messages: Arc<Mutex<Vec<String>>>,
    }

    impl WarningCapture {
        /// Create a new WarningCapture instance
        pub fn new() -> Self {
            Self::default()
        }

        /// Retrieve captured messages
        pub fn messages(&self) -> Vec<String> {
            self.messages.lock().clone()
        }

        /// Check if any message contains `needle`
        pub fn contains(&self, needle: &str) -> bool {
            self.messages.lock().iter().any(|message| message.contains(needle))
        }
    }

    impl<S> tracing_subscriber::Layer<S> for WarningCapture
    where
        S: tracing::Subscriber,
    {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() > Level::WARN {
                return;
            }

            struct MessageVisitor {
                message: String,
            }

            impl tracing::field::Visit for MessageVisitor {
                fn record_debug(
                    &mut self,
                    field: &tracing::field::Field,
                    value: &dyn std::fmt::Debug,
                ) {
                    if field.name() == "message" {
                        self.message = format!("{value:?}");
                    }
                }

                fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                    if field.name() == "message" {
                        self.message = value.to_string();
                    }
                }
            }

            let mut visitor = MessageVisitor { message: String::new() };
            event.record(&mut visitor);

            if !visitor.message.is_empty() {
                self.messages.lock().push(visitor.message);
            }
        }
    }

    /// Capture warnings logged on the current thread until the guard drops.
    ///
    /// Works with the default current-thread `#[tokio::test]` runtime.
    pub fn capture_warnings() -> (WarningCapture, DefaultGuard) {
        let capture = WarningCapture::new();
        let subscriber = tracing_subscriber::registry()
            .with(capture.clone())
            .with(tracing_subscriber::fmt::layer().with_test_writer());
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }
}

/// A scriptable in-memory debugging backend
pub mod mock {
    use super::*;
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    };

    use eyre::{bail, eyre, Result};
    use tokio::sync::Semaphore;
    use tokio_util::sync::CancellationToken;
    use vartree::{join_path, DebugBackend, EvalOptions, StackFrame, ValueInfo, ValueNode};

    /// A backend whose values, failures and timing are scripted by the test.
    ///
    /// Children are keyed by the parent's path. A gate installed with
    /// [`MockBackend::gate_loads`] or [`MockBackend::gate_refreshes`] holds
    /// every call until the test adds a permit.
    #[derive(Default)]
    pub struct MockBackend {
        children: Mutex<HashMap<String, Vec<ValueInfo>>>,
        refreshed: Mutex<HashMap<String, ValueInfo>>,
        inline_visualizers: Mutex<HashMap<String, std::result::Result<String, String>>>,
        visualizer_result: Mutex<Option<std::result::Result<bool, String>>>,

        disconnected: AtomicBool,
        running: AtomicBool,
        has_visualizers: AtomicBool,
        fail_loads: AtomicBool,
        fail_refreshes: AtomicBool,
        fail_set_value: AtomicBool,

        load_gate: Mutex<Option<Arc<Semaphore>>>,
        refresh_gate: Mutex<Option<Arc<Semaphore>>>,

        load_calls: AtomicUsize,
        load_requests: Mutex<Vec<(String, usize, Option<usize>)>>,
        refresh_requests: Mutex<Vec<(String, EvalOptions)>>,
        set_requests: Mutex<Vec<(String, String)>>,
        visualizer_requests: Mutex<Vec<String>>,
        changed_notifications: Mutex<Vec<String>>,
    }

    impl MockBackend {
        /// Create a connected, paused backend without values
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the children of the node at `path`
        pub fn with_children(self, path: &str, children: Vec<ValueInfo>) -> Self {
            self.set_children(path, children);
            self
        }

        /// Script (or replace) the children of the node at `path`
        pub fn set_children(&self, path: &str, children: Vec<ValueInfo>) {
            self.children.lock().insert(path.to_string(), children);
        }

        /// Script what refreshing the node at `path` returns
        pub fn set_refreshed(&self, path: &str, info: ValueInfo) {
            self.refreshed.lock().insert(path.to_string(), info);
        }

        /// Script an inline visualizer rendering (or failure) for `path`
        pub fn set_inline_visualizer(&self, path: &str, rendering: std::result::Result<&str, &str>) {
            let rendering = rendering.map(str::to_string).map_err(str::to_string);
            self.inline_visualizers.lock().insert(path.to_string(), rendering);
        }

        /// Script what showing the pop-up visualizer reports
        pub fn set_visualizer_result(&self, result: std::result::Result<bool, &str>) {
            *self.visualizer_result.lock() = Some(result.map_err(str::to_string));
        }

        /// Toggle the connected state
        pub fn set_connected(&self, connected: bool) {
            self.disconnected.store(!connected, Ordering::SeqCst);
        }

        /// Toggle the paused state
        pub fn set_paused(&self, paused: bool) {
            self.running.store(!paused, Ordering::SeqCst);
        }

        /// Toggle whether any visualizer is registered
        pub fn set_has_visualizers(&self, enabled: bool) {
            self.has_visualizers.store(enabled, Ordering::SeqCst);
        }

        /// Make every child load fail
        pub fn fail_loads(&self, fail: bool) {
            self.fail_loads.store(fail, Ordering::SeqCst);
        }

        /// Make every refresh fail
        pub fn fail_refreshes(&self, fail: bool) {
            self.fail_refreshes.store(fail, Ordering::SeqCst);
        }

        /// Make every value write fail
        pub fn fail_set_value(&self, fail: bool) {
            self.fail_set_value.store(fail, Ordering::SeqCst);
        }

        /// Hold child loads until permits are added to the returned semaphore
        pub fn gate_loads(&self) -> Arc<Semaphore> {
            let gate = Arc::new(Semaphore::new(0));
            *self.load_gate.lock() = Some(Arc::clone(&gate));
            gate
        }

        /// Hold refreshes until permits are added to the returned semaphore
        pub fn gate_refreshes(&self) -> Arc<Semaphore> {
            let gate = Arc::new(Semaphore::new(0));
            *self.refresh_gate.lock() = Some(Arc::clone(&gate));
            gate
        }

        /// Number of child loads issued
        pub fn load_calls(&self) -> usize {
            self.load_calls.load(Ordering::SeqCst)
        }

        /// Child loads issued, as `(path, offset, count)`
        pub fn load_requests(&self) -> Vec<(String, usize, Option<usize>)> {
            self.load_requests.lock().clone()
        }

        /// Refreshes issued, as `(path, options)`
        pub fn refresh_requests(&self) -> Vec<(String, EvalOptions)> {
            self.refresh_requests.lock().clone()
        }

        /// Paths refreshed, in order
        pub fn refreshed_paths(&self) -> Vec<String> {
            self.refresh_requests.lock().iter().map(|(path, _)| path.clone()).collect()
        }

        /// Value writes issued, as `(path, value)`
        pub fn set_requests(&self) -> Vec<(String, String)> {
            self.set_requests.lock().clone()
        }

        /// Paths a pop-up visualizer was shown for
        pub fn visualizer_requests(&self) -> Vec<String> {
            self.visualizer_requests.lock().clone()
        }

        /// Paths reported as changed to outside observers
        pub fn changed_notifications(&self) -> Vec<String> {
            self.changed_notifications.lock().clone()
        }

        async fn pass(gate: &Mutex<Option<Arc<Semaphore>>>) -> Result<()> {
            let gate = gate.lock().clone();
            if let Some(gate) = gate {
                gate.acquire().await.map_err(|_| eyre!("gate closed"))?.forget();
            }
            Ok(())
        }

        /// Write `value` into the scripted child (and refresh result) at `path`
        fn store_value(&self, path: &str, value: &str) {
            for (parent, children) in self.children.lock().iter_mut() {
                for child in children.iter_mut() {
                    if join_path(parent, &child.name) == path {
                        child.value = value.to_string();
                        child.display_value = None;
                    }
                }
            }
            if let Some(info) = self.refreshed.lock().get_mut(path) {
                info.value = value.to_string();
                info.display_value = None;
            }
        }
    }

    impl DebugBackend for MockBackend {
        type Frame = MockFrame;

        fn is_connected(&self) -> bool {
            !self.disconnected.load(Ordering::SeqCst)
        }

        fn is_paused(&self) -> bool {
            !self.running.load(Ordering::SeqCst)
        }

        async fn load_children(
            &self,
            node: &ValueNode,
            offset: usize,
            count: Option<usize>,
            _cancel: &CancellationToken,
        ) -> Result<Vec<ValueInfo>> {
            self.load_calls.fetch_add(1, Ordering::SeqCst);
            self.load_requests.lock().push((node.path().to_string(), offset, count));

            Self::pass(&self.load_gate).await?;
            if self.fail_loads.load(Ordering::SeqCst) {
                bail!("scripted load failure for {}", node.path());
            }

            let children = self.children.lock().get(node.path()).cloned().unwrap_or_default();
            Ok(children.into_iter().skip(offset).take(count.unwrap_or(usize::MAX)).collect())
        }

        async fn refresh(&self, node: &ValueNode, options: EvalOptions) -> Result<ValueInfo> {
            self.refresh_requests.lock().push((node.path().to_string(), options));

            Self::pass(&self.refresh_gate).await?;
            if self.fail_refreshes.load(Ordering::SeqCst) {
                bail!("scripted refresh failure for {}", node.path());
            }
            let refreshed = self.refreshed.lock().get(node.path()).cloned();
            Ok(refreshed.unwrap_or_else(|| {
                let mut info = ValueInfo::new(node.name(), node.value());
                info.is_enumerable = node.is_enumerable();
                info.can_edit = node.can_edit();
                info.is_null = node.is_null();
                info
            }))
        }

        async fn set_value(&self, node: &ValueNode, value: &str) -> Result<()> {
            self.set_requests.lock().push((node.path().to_string(), value.to_string()));
            if self.fail_set_value.load(Ordering::SeqCst) {
                bail!("backend rejected '{value}' for {}", node.path());
            }
            self.store_value(node.path(), value);
            Ok(())
        }

        fn has_visualizers(&self) -> bool {
            self.has_visualizers.load(Ordering::SeqCst)
        }

        fn has_inline_visualizer(&self, node: &ValueNode) -> bool {
            self.inline_visualizers.lock().contains_key(node.path())
        }

        fn render_inline_visualizer(&self, node: &ValueNode) -> Result<String> {
            match self.inline_visualizers.lock().get(node.path()) {
                Some(Ok(rendering)) => Ok(rendering.clone()),
                Some(Err(message)) => Err(eyre!("{message}")),
                None => bail!("no inline visualizer for {}", node.path()),
            }
        }

        async fn show_visualizer(&self, node: &ValueNode) -> Result<bool> {
            self.visualizer_requests.lock().push(node.path().to_string());
            match self.visualizer_result.lock().clone() {
                Some(Ok(changed)) => Ok(changed),
                Some(Err(message)) => Err(eyre!("{message}")),
                None => Ok(false),
            }
        }

        fn notify_variable_changed(&self, node: &ValueNode) {
            self.changed_notifications.lock().push(node.path().to_string());
        }
    }

    /// A frame resolving scripted expressions
    #[derive(Default)]
    pub struct MockFrame {
        values: HashMap<String, ValueInfo>,
        options: EvalOptions,
        evaluated: Mutex<Vec<String>>,
    }

    impl MockFrame {
        /// Create a frame that knows no expressions
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the value of `expr`
        pub fn with_value(mut self, expr: &str, info: ValueInfo) -> Self {
            self.values.insert(expr.to_string(), info);
            self
        }

        /// Use `options` as the frame's evaluation options
        pub fn with_options(mut self, options: EvalOptions) -> Self {
            self.options = options;
            self
        }

        /// Expressions evaluated so far, in order
        pub fn evaluated(&self) -> Vec<String> {
            self.evaluated.lock().clone()
        }
    }

    impl StackFrame for MockFrame {
        async fn evaluate(&self, expr: &str) -> Result<ValueInfo> {
            self.evaluated.lock().push(expr.to_string());
            self.values.get(expr).cloned().ok_or_else(|| eyre!("cannot evaluate '{expr}'"))
        }

        fn evaluation_options(&self) -> EvalOptions {
            self.options.clone()
        }
    }
}

/// Event and value helpers
pub mod fixtures {
    use tokio::sync::broadcast;
    use vartree::{TreeEvent, ValueInfo};

    /// Every event received so far
    pub fn drain(rx: &mut broadcast::Receiver<TreeEvent>) -> Vec<TreeEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    /// `count` indexed values `[0]`, `[1]`, ...
    pub fn indexed(count: usize) -> Vec<ValueInfo> {
        (0..count).map(|i| ValueInfo::new(format!("[{i}]"), i.to_string())).collect()
    }

    /// Plain values named after `names`, each valued `"0"`
    pub fn named(names: &[&str]) -> Vec<ValueInfo> {
        names.iter().map(|name| ValueInfo::new(*name, "0")).collect()
    }
}
