//! Playback controller.
//!
//! Owns one [`MediaEngine`] and one [`FocusManager`] client. Every transport call is
//! refused (returns `false`/`0`) until the engine reports the source as prepared:
//! - `init` submits the source and starts asynchronous preparation
//! - the prepared event seeks to 0 and publishes the prepared flag
//! - `play` starts the engine only after focus has been granted
//! - focus loss pauses playback

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::engine::{EngineEvents, MediaEngine};
use crate::error::LoadError;
use crate::focus::{FocusListener, FocusManager};
use crate::listener::PlayerListener;
use crate::source::SourceRef;

/// Transport front end for one playback session.
pub struct PlaybackController<E: MediaEngine + 'static, F: FocusManager + 'static> {
    session: Arc<Session<E, F>>,
}

struct Session<E: MediaEngine, F: FocusManager> {
    engine: E,
    focus: F,
    /// Written once from the engine's event thread, read from any thread.
    prepared: AtomicBool,
    initialized: AtomicBool,
    released: AtomicBool,
    listener: Mutex<Option<Arc<dyn PlayerListener>>>,
    load_error: Mutex<Option<Arc<LoadError>>>,
    /// Serializes transport commands so caller and focus-loss pauses cannot interleave.
    transport: Mutex<()>,
}

/// Engine event handler. Holds a weak reference so the engine does not keep the session alive.
struct EngineBridge<E: MediaEngine, F: FocusManager> {
    session: Weak<Session<E, F>>,
}

struct FocusBridge<E: MediaEngine, F: FocusManager> {
    session: Weak<Session<E, F>>,
}

impl<E: MediaEngine + 'static, F: FocusManager + 'static> PlaybackController<E, F> {
    /// Create a controller and register it as the focus client's listener.
    pub fn new(engine: E, focus: F) -> Self {
        let session = Arc::new(Session {
            engine,
            focus,
            prepared: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            released: AtomicBool::new(false),
            listener: Mutex::new(None),
            load_error: Mutex::new(None),
            transport: Mutex::new(()),
        });
        session.focus.set_focus_listener(Arc::new(FocusBridge {
            session: Arc::downgrade(&session),
        }));
        Self { session }
    }

    /// Submit `source` for asynchronous preparation.
    ///
    /// Never fails at the call site: a source that cannot be loaded is logged,
    /// recorded in [`load_error`](Self::load_error) and reported through
    /// [`PlayerListener::on_error`]; the session then stays unprepared.
    /// A controller accepts one source; later calls are ignored.
    pub fn init(&self, source: impl Into<SourceRef>, listener: Option<Arc<dyn PlayerListener>>) {
        let source = source.into();
        let s = &self.session;
        if s.initialized.swap(true, Ordering::AcqRel) {
            tracing::warn!(source = %source, "controller already initialized; init ignored");
            return;
        }

        *lock(&s.listener) = listener;
        s.engine.set_event_handler(Arc::new(EngineBridge {
            session: Arc::downgrade(s),
        }));

        match s.engine.set_source(&source) {
            Ok(()) => {
                tracing::debug!(source = %source, "source submitted; preparing");
                s.engine.prepare_async();
            }
            Err(err) => {
                tracing::warn!(source = %source, error = %err, "failed to load source");
                s.record_failure(err);
            }
        }
    }

    /// Start playback. `true` only if prepared, not already playing, and focus was granted.
    pub fn play(&self) -> bool {
        let s = &self.session;
        if !s.is_prepared() || s.engine.is_playing() {
            return false;
        }
        // Focus is requested outside the transport lock: granting it may pause another
        // controller synchronously, which takes that controller's own lock.
        if !s.focus.request_focus() {
            tracing::debug!("audio focus denied; not starting");
            return false;
        }

        let _transport = s.transport();
        if !s.is_prepared() {
            // Released while focus was being requested.
            s.focus.release_focus();
            return false;
        }
        if s.engine.is_playing() {
            return false;
        }
        s.engine.start();
        tracing::debug!("playback started");
        true
    }

    /// Pause playback. `true` only if prepared and the engine was playing.
    pub fn pause(&self) -> bool {
        self.session.pause()
    }

    /// Seek back to the start without stopping playback.
    pub fn reset(&self) -> bool {
        let s = &self.session;
        let _transport = s.transport();
        if !s.is_prepared() {
            return false;
        }
        s.engine.seek_to(0);
        true
    }

    pub fn is_playing(&self) -> bool {
        let s = &self.session;
        s.is_prepared() && s.engine.is_playing()
    }

    /// Current position in milliseconds, `0` while unprepared.
    pub fn current_position(&self) -> u64 {
        let s = &self.session;
        if s.is_prepared() {
            s.engine.current_position()
        } else {
            0
        }
    }

    pub fn seek_to(&self, position_ms: u64) {
        let s = &self.session;
        let _transport = s.transport();
        if s.is_prepared() {
            s.engine.seek_to(position_ms);
        }
    }

    /// Release the engine and give up focus.
    ///
    /// Only acts on a prepared session, and clears the prepared flag so a second call
    /// is a no-op. An engine released before preparation completes is freed on drop.
    pub fn release(&self) {
        let s = &self.session;
        {
            let _transport = s.transport();
            if !s.prepared.swap(false, Ordering::AcqRel) {
                return;
            }
            s.released.store(true, Ordering::Release);
        }
        // Outside the lock: the engine may wait for its event thread, which can be
        // inside a listener issuing transport calls.
        s.engine.release();
        s.focus.release_focus();
        tracing::info!("player released");
    }

    /// Focus notification entry point. Loss pauses playback; gain changes nothing.
    pub fn on_focus_changed(&self, is_gained: bool) {
        self.session.on_focus_changed(is_gained);
    }

    pub fn is_prepared(&self) -> bool {
        self.session.is_prepared()
    }

    /// Why the source never became prepared, if loading failed.
    pub fn load_error(&self) -> Option<Arc<LoadError>> {
        lock(&self.session.load_error).clone()
    }

    pub fn engine(&self) -> &E {
        &self.session.engine
    }
}

impl<E: MediaEngine, F: FocusManager> Session<E, F> {
    fn is_prepared(&self) -> bool {
        self.prepared.load(Ordering::Acquire)
    }

    fn transport(&self) -> MutexGuard<'_, ()> {
        lock(&self.transport)
    }

    fn listener(&self) -> Option<Arc<dyn PlayerListener>> {
        lock(&self.listener).clone()
    }

    fn pause(&self) -> bool {
        let _transport = self.transport();
        if self.is_prepared() && self.engine.is_playing() {
            self.engine.pause();
            tracing::debug!("playback paused");
            return true;
        }
        false
    }

    fn on_focus_changed(&self, is_gained: bool) {
        if is_gained {
            tracing::debug!("audio focus gained");
            return;
        }
        let paused = self.pause();
        tracing::debug!(paused, "audio focus lost");
    }

    fn handle_prepared(&self) {
        {
            let _transport = self.transport();
            if self.released.load(Ordering::Acquire) || self.is_prepared() {
                tracing::debug!("late or duplicate prepared event ignored");
                return;
            }
            self.engine.seek_to(0);
            // Published before the listener runs so transport calls made from
            // `on_prepared` already succeed.
            self.prepared.store(true, Ordering::Release);
        }
        tracing::info!("source prepared");
        if let Some(listener) = self.listener() {
            listener.on_prepared(&self.engine);
        }
    }

    fn handle_completion(&self) {
        tracing::debug!("playback completed");
        if let Some(listener) = self.listener() {
            listener.on_completion();
        }
    }

    fn record_failure(&self, err: LoadError) {
        let err = Arc::new(err);
        *lock(&self.load_error) = Some(err.clone());
        if let Some(listener) = self.listener() {
            listener.on_error(&err);
        }
    }
}

impl<E, F> Drop for Session<E, F>
where
    E: MediaEngine,
    F: FocusManager,
{
    fn drop(&mut self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.engine.release();
            self.focus.release_focus();
        }
    }
}

impl<E: MediaEngine, F: FocusManager> EngineEvents for EngineBridge<E, F> {
    fn on_prepared(&self) {
        if let Some(s) = self.session.upgrade() {
            s.handle_prepared();
        }
    }

    fn on_completion(&self) {
        if let Some(s) = self.session.upgrade() {
            s.handle_completion();
        }
    }

    fn on_error(&self, error: LoadError) {
        if let Some(s) = self.session.upgrade() {
            tracing::error!(error = %error, "source preparation failed");
            s.record_failure(error);
        }
    }
}

impl<E: MediaEngine, F: FocusManager> FocusListener for FocusBridge<E, F> {
    fn on_focus_changed(&self, is_gained: bool) {
        if let Some(s) = self.session.upgrade() {
            s.on_focus_changed(is_gained);
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::FocusArbiter;
    use crossbeam_channel::{Receiver, Sender};
    use std::sync::atomic::{AtomicU64, AtomicUsize};
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(2);

    /// Engine double. Preparation completes when the test fires it, or from a
    /// background thread when `auto_prepare` is set.
    #[derive(Default)]
    struct FakeEngine {
        fail_source: bool,
        auto_prepare: bool,
        handler: Mutex<Option<Arc<dyn EngineEvents>>>,
        playing: AtomicBool,
        position: AtomicU64,
        prepare_calls: AtomicUsize,
        start_calls: AtomicUsize,
        pause_calls: AtomicUsize,
        release_calls: Arc<AtomicUsize>,
        seeks: Mutex<Vec<u64>>,
    }

    impl FakeEngine {
        fn failing() -> Self {
            Self {
                fail_source: true,
                ..Self::default()
            }
        }

        fn auto() -> Self {
            Self {
                auto_prepare: true,
                ..Self::default()
            }
        }

        fn handler(&self) -> Arc<dyn EngineEvents> {
            self.handler.lock().unwrap().clone().expect("handler registered")
        }

        fn fire_prepared(&self) {
            self.handler().on_prepared();
        }
    }

    impl MediaEngine for FakeEngine {
        fn set_source(&self, source: &SourceRef) -> Result<(), LoadError> {
            if self.fail_source {
                return Err(LoadError::InvalidSource(source.to_string()));
            }
            Ok(())
        }

        fn prepare_async(&self) {
            self.prepare_calls.fetch_add(1, Ordering::SeqCst);
            if self.auto_prepare {
                let handler = self.handler();
                std::thread::spawn(move || {
                    std::thread::sleep(Duration::from_millis(10));
                    handler.on_prepared();
                });
            }
        }

        fn set_event_handler(&self, handler: Arc<dyn EngineEvents>) {
            *self.handler.lock().unwrap() = Some(handler);
        }

        fn seek_to(&self, position_ms: u64) {
            self.position.store(position_ms, Ordering::SeqCst);
            self.seeks.lock().unwrap().push(position_ms);
        }

        fn start(&self) {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            self.playing.store(true, Ordering::SeqCst);
        }

        fn pause(&self) {
            self.pause_calls.fetch_add(1, Ordering::SeqCst);
            self.playing.store(false, Ordering::SeqCst);
        }

        fn is_playing(&self) -> bool {
            self.playing.load(Ordering::SeqCst)
        }

        fn current_position(&self) -> u64 {
            self.position.load(Ordering::SeqCst)
        }

        fn release(&self) {
            self.release_calls.fetch_add(1, Ordering::SeqCst);
            self.playing.store(false, Ordering::SeqCst);
        }
    }

    type Hook = Box<dyn Fn() + Send + Sync>;

    struct FakeFocus {
        grant: AtomicBool,
        held: AtomicBool,
        requests: AtomicUsize,
        releases: AtomicUsize,
        listener: Mutex<Option<Arc<dyn FocusListener>>>,
        /// Runs inside `request_focus` before the grant is decided.
        during_request: Mutex<Option<Hook>>,
    }

    impl FakeFocus {
        fn granting(grant: bool) -> Self {
            Self {
                grant: AtomicBool::new(grant),
                held: AtomicBool::new(false),
                requests: AtomicUsize::new(0),
                releases: AtomicUsize::new(0),
                listener: Mutex::new(None),
                during_request: Mutex::new(None),
            }
        }

        fn notify(&self, gained: bool) {
            let listener = self.listener.lock().unwrap().clone();
            listener.expect("focus listener registered").on_focus_changed(gained);
        }
    }

    impl FocusManager for FakeFocus {
        fn request_focus(&self) -> bool {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if let Some(hook) = self.during_request.lock().unwrap().as_ref() {
                hook();
            }
            let granted = self.grant.load(Ordering::SeqCst);
            if granted {
                self.held.store(true, Ordering::SeqCst);
            }
            granted
        }

        fn release_focus(&self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
            self.held.store(false, Ordering::SeqCst);
        }

        fn set_focus_listener(&self, listener: Arc<dyn FocusListener>) {
            *self.listener.lock().unwrap() = Some(listener);
        }
    }

    #[derive(Debug, PartialEq)]
    enum Event {
        Prepared { position_ms: u64 },
        Completed,
        Failed,
    }

    struct ChannelListener {
        tx: Sender<Event>,
    }

    impl PlayerListener for ChannelListener {
        fn on_prepared(&self, engine: &dyn MediaEngine) {
            let _ = self.tx.send(Event::Prepared {
                position_ms: engine.current_position(),
            });
        }

        fn on_completion(&self) {
            let _ = self.tx.send(Event::Completed);
        }

        fn on_error(&self, _error: &LoadError) {
            let _ = self.tx.send(Event::Failed);
        }
    }

    fn listener() -> (Arc<dyn PlayerListener>, Receiver<Event>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Arc::new(ChannelListener { tx }), rx)
    }

    fn prepared_controller(grant: bool) -> PlaybackController<FakeEngine, FakeFocus> {
        let ctl = PlaybackController::new(FakeEngine::default(), FakeFocus::granting(grant));
        ctl.init("track.flac", None);
        ctl.engine().fire_prepared();
        ctl
    }

    #[test]
    fn unprepared_controller_refuses_transport() {
        let ctl = PlaybackController::new(FakeEngine::default(), FakeFocus::granting(true));
        ctl.init("track.flac", None);
        ctl.engine().position.store(1234, Ordering::SeqCst);

        assert!(!ctl.play());
        assert!(!ctl.pause());
        assert!(!ctl.reset());
        ctl.seek_to(500);
        ctl.release();
        assert!(!ctl.is_playing());
        assert_eq!(ctl.current_position(), 0);

        let engine = ctl.engine();
        assert_eq!(engine.start_calls.load(Ordering::SeqCst), 0);
        assert_eq!(engine.release_calls.load(Ordering::SeqCst), 0);
        assert!(engine.seeks.lock().unwrap().is_empty());
        assert_eq!(ctl.session.focus.requests.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn prepared_seeks_to_start() {
        let ctl = PlaybackController::new(FakeEngine::default(), FakeFocus::granting(true));
        ctl.init("track.flac", None);
        ctl.engine().position.store(900, Ordering::SeqCst);
        ctl.engine().fire_prepared();

        assert!(ctl.is_prepared());
        assert_eq!(ctl.current_position(), 0);
        assert_eq!(*ctl.engine().seeks.lock().unwrap(), vec![0]);
    }

    #[test]
    fn duplicate_prepared_event_does_not_rewind() {
        let ctl = prepared_controller(true);
        ctl.seek_to(3000);
        ctl.engine().fire_prepared();
        assert_eq!(ctl.current_position(), 3000);
    }

    #[test]
    fn play_requires_focus() {
        let ctl = prepared_controller(false);
        assert!(!ctl.play());
        assert!(!ctl.is_playing());
        assert_eq!(ctl.engine().start_calls.load(Ordering::SeqCst), 0);
        assert_eq!(ctl.session.focus.requests.load(Ordering::SeqCst), 1);

        ctl.session.focus.grant.store(true, Ordering::SeqCst);
        assert!(ctl.play());
        assert!(ctl.is_playing());
    }

    #[test]
    fn play_refused_while_playing() {
        let ctl = prepared_controller(true);
        assert!(ctl.play());
        assert!(!ctl.play());
        assert_eq!(ctl.engine().start_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn second_pause_returns_false() {
        let ctl = prepared_controller(true);
        assert!(!ctl.pause());
        assert!(ctl.play());
        assert!(ctl.pause());
        assert!(!ctl.pause());
        assert_eq!(ctl.engine().pause_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reset_rewinds_without_stopping() {
        let ctl = prepared_controller(true);
        assert!(ctl.play());
        ctl.seek_to(42_000);
        assert_eq!(ctl.current_position(), 42_000);
        assert!(ctl.reset());
        assert_eq!(ctl.current_position(), 0);
        assert!(ctl.is_playing());
    }

    #[test]
    fn focus_loss_pauses_and_matches_direct_pause() {
        let ctl = prepared_controller(true);
        assert!(ctl.play());
        ctl.session.focus.notify(false);
        assert!(!ctl.is_playing());
        assert!(!ctl.pause());

        ctl.session.focus.notify(true);
        assert!(!ctl.is_playing());
        ctl.on_focus_changed(false);
        assert_eq!(ctl.engine().pause_calls.load(Ordering::SeqCst), 1);

        assert!(ctl.play());
        assert!(ctl.is_playing());
    }

    #[test]
    fn concurrent_pauses_succeed_once() {
        let ctl = Arc::new(prepared_controller(true));
        assert!(ctl.play());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ctl = ctl.clone();
                std::thread::spawn(move || ctl.pause())
            })
            .collect();
        let paused = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|p| *p)
            .count();

        assert_eq!(paused, 1);
        assert_eq!(ctl.engine().pause_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn release_clears_prepared_once() {
        let ctl = prepared_controller(true);
        assert!(ctl.play());
        ctl.release();
        assert!(!ctl.is_prepared());
        assert!(!ctl.play());
        ctl.release();

        assert_eq!(ctl.engine().release_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctl.session.focus.releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn play_racing_release_gives_focus_back() {
        let ctl = Arc::new(prepared_controller(true));
        let weak = Arc::downgrade(&ctl);
        *ctl.session.focus.during_request.lock().unwrap() = Some(Box::new(move || {
            if let Some(ctl) = weak.upgrade() {
                ctl.release();
            }
        }));

        assert!(!ctl.play());
        assert!(!ctl.session.focus.held.load(Ordering::SeqCst));
        assert_eq!(ctl.engine().start_calls.load(Ordering::SeqCst), 0);
        assert_eq!(ctl.engine().release_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn play_while_playing_keeps_focus() {
        let ctl = prepared_controller(true);
        assert!(ctl.play());
        assert!(!ctl.play());
        assert!(ctl.session.focus.held.load(Ordering::SeqCst));
    }

    #[test]
    fn prepared_event_after_release_is_ignored() {
        let ctl = prepared_controller(true);
        ctl.release();
        ctl.engine().fire_prepared();
        assert!(!ctl.is_prepared());
    }

    #[test]
    fn drop_releases_engine_that_never_prepared() {
        let ctl = PlaybackController::new(FakeEngine::default(), FakeFocus::granting(true));
        ctl.init("track.flac", None);
        ctl.release();
        let released = ctl.engine().release_calls.clone();
        assert_eq!(released.load(Ordering::SeqCst), 0);

        let handler = ctl.engine().handler();
        drop(ctl);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        // The engine's handler does not keep the session alive.
        handler.on_prepared();
    }

    #[test]
    fn init_failure_is_reported_not_raised() {
        let (listener, rx) = listener();
        let ctl = PlaybackController::new(FakeEngine::failing(), FakeFocus::granting(true));
        ctl.init("missing.flac", Some(listener));

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Event::Failed);
        assert!(rx.try_recv().is_err());
        assert!(matches!(
            ctl.load_error().as_deref(),
            Some(LoadError::InvalidSource(s)) if s == "missing.flac"
        ));
        assert_eq!(ctl.engine().prepare_calls.load(Ordering::SeqCst), 0);
        assert!(!ctl.play());
        assert!(!ctl.is_prepared());
    }

    #[test]
    fn async_prepare_error_reaches_listener() {
        let (listener, rx) = listener();
        let ctl = PlaybackController::new(FakeEngine::default(), FakeFocus::granting(true));
        ctl.init("track.flac", Some(listener));
        ctl.engine()
            .handler()
            .on_error(LoadError::Prepare("no output device".into()));

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Event::Failed);
        assert!(matches!(ctl.load_error().as_deref(), Some(LoadError::Prepare(_))));
        assert!(!ctl.play());
    }

    #[test]
    fn second_init_is_ignored() {
        let ctl = PlaybackController::new(FakeEngine::default(), FakeFocus::granting(true));
        ctl.init("a.flac", None);
        ctl.init("b.flac", None);
        assert_eq!(ctl.engine().prepare_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn completion_is_forwarded() {
        let (listener, rx) = listener();
        let ctl = PlaybackController::new(FakeEngine::default(), FakeFocus::granting(true));
        ctl.init("track.flac", Some(listener));
        ctl.engine().fire_prepared();
        ctl.engine().handler().on_completion();

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Event::Prepared { position_ms: 0 });
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Event::Completed);
        assert!(ctl.is_prepared());
    }

    struct PlayOnPrepared {
        ctl: Mutex<Option<Weak<PlaybackController<FakeEngine, FakeFocus>>>>,
        tx: Sender<bool>,
    }

    impl PlayerListener for PlayOnPrepared {
        fn on_prepared(&self, _engine: &dyn MediaEngine) {
            let ctl = self.ctl.lock().unwrap().as_ref().and_then(Weak::upgrade);
            let started = ctl.map(|c| c.play()).unwrap_or(false);
            let _ = self.tx.send(started);
        }
    }

    #[test]
    fn transport_works_inside_prepared_callback() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let listener = Arc::new(PlayOnPrepared {
            ctl: Mutex::new(None),
            tx,
        });
        let ctl = Arc::new(PlaybackController::new(
            FakeEngine::auto(),
            FakeFocus::granting(true),
        ));
        *listener.ctl.lock().unwrap() = Some(Arc::downgrade(&ctl));
        ctl.init("track.flac", Some(listener));

        assert!(rx.recv_timeout(WAIT).unwrap());
        assert!(ctl.is_playing());
    }

    #[test]
    fn focus_interruption_scenario() {
        let arbiter = FocusArbiter::new();
        let (listener, rx) = listener();
        let ctl = PlaybackController::new(FakeEngine::auto(), arbiter.client());
        ctl.init("track.flac", Some(listener));

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Event::Prepared { position_ms: 0 });
        assert!(ctl.play());
        assert!(ctl.is_playing());

        arbiter.interrupt();
        assert!(!ctl.is_playing());
        assert!(!ctl.play());

        arbiter.end_interruption();
        assert!(!ctl.is_playing());
        assert!(ctl.play());
        assert!(ctl.is_playing());
    }

    #[test]
    fn second_controller_takes_focus_from_first() {
        let arbiter = FocusArbiter::new();
        let first = PlaybackController::new(FakeEngine::default(), arbiter.client());
        let second = PlaybackController::new(FakeEngine::default(), arbiter.client());
        for ctl in [&first, &second] {
            ctl.init("track.flac", None);
            ctl.engine().fire_prepared();
        }

        assert!(first.play());
        assert!(second.play());
        assert!(!first.is_playing());
        assert!(second.is_playing());
    }

    #[test]
    fn invalid_source_never_prepares() {
        let (listener, rx) = listener();
        let ctl = PlaybackController::new(FakeEngine::failing(), FakeFocus::granting(true));
        ctl.init("", Some(listener));
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Event::Failed);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        for _ in 0..3 {
            assert!(!ctl.play());
        }
    }
}
