//! Tests for the input router

use super::*;
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum View {
    Play,
    Browse,
    Shift,
}

#[derive(Default)]
struct RecordingScheduler {
    tasks: Mutex<Vec<DeferredTask>>,
}

impl RecordingScheduler {
    fn targets(&self) -> Vec<ResyncTarget> {
        self.tasks.lock().iter().map(|t| t.target).collect()
    }
}

impl Scheduler for RecordingScheduler {
    fn schedule_once(&self, task: DeferredTask) {
        self.tasks.lock().push(task);
    }
}

fn make_config() -> RouterConfig<View> {
    RouterConfig {
        control_channel: Some(2),
        shift_note: 7,
        pad_notes: 36..=51,
        resync_delay: Duration::from_millis(100),
        shift_view: View::Shift,
    }
}

fn make_router() -> (InputRouter<View>, Arc<RecordingScheduler>) {
    let scheduler = Arc::new(RecordingScheduler::default());
    let router = InputRouter::new(make_config(), View::Play, scheduler.clone());
    (router, scheduler)
}

/// Handler that appends every event it sees to a shared log
fn recorder(log: &Arc<Mutex<Vec<ControlEvent>>>) -> impl Handler<View> + 'static {
    let log = log.clone();
    move |_: &mut LayerState<View>, event: &ControlEvent| log.lock().push(*event)
}

#[test]
fn test_shift_press_and_release_restores_view() {
    let (mut router, scheduler) = make_router();

    assert_eq!(router.process(&[0x92, 7, 127]), Ok(RouteOutcome::ShiftPressed));
    assert!(router.layer().is_shifted());
    assert_eq!(*router.layer().active_view(), View::Shift);

    assert_eq!(router.process(&[0x92, 7, 0]), Ok(RouteOutcome::ShiftReleased));
    assert!(!router.layer().is_shifted());
    assert_eq!(*router.layer().active_view(), View::Play);

    assert_eq!(scheduler.targets(), vec![ResyncTarget::AllPads]);
}

#[test]
fn test_shift_release_as_note_off() {
    let (mut router, scheduler) = make_router();
    router.process(&[0x92, 7, 127]).unwrap();
    assert_eq!(router.process(&[0x82, 7, 64]), Ok(RouteOutcome::ShiftReleased));
    assert_eq!(*router.layer().active_view(), View::Play);
    assert_eq!(scheduler.targets(), vec![ResyncTarget::AllPads]);
}

#[test]
fn test_view_switch_while_shifted_is_kept() {
    let (mut router, _) = make_router();
    router.bind(
        View::Shift,
        ControlId::Note(1),
        |layer: &mut LayerState<View>, _: &ControlEvent| layer.set_active_view(View::Browse),
    );

    router.process(&[0x92, 7, 127]).unwrap();
    assert_eq!(router.process(&[0x92, 1, 127]), Ok(RouteOutcome::Dispatched));
    assert_eq!(*router.layer().active_view(), View::Browse);
    assert!(router.layer().is_shifted());

    router.process(&[0x92, 7, 0]).unwrap();
    assert!(!router.layer().is_shifted());
    assert_eq!(*router.layer().active_view(), View::Browse);
}

#[test]
fn test_repeated_shift_edges_are_ignored() {
    let (mut router, scheduler) = make_router();

    assert_eq!(router.process(&[0x92, 7, 0]), Ok(RouteOutcome::Ignored));
    assert!(scheduler.targets().is_empty());

    router.process(&[0x92, 7, 127]).unwrap();
    assert_eq!(router.process(&[0x92, 7, 127]), Ok(RouteOutcome::Ignored));
    router.process(&[0x92, 7, 0]).unwrap();
    assert_eq!(*router.layer().active_view(), View::Play);
    assert_eq!(router.layer().previous_view(), None);
}

#[test]
fn test_other_channel_is_filtered() {
    let (mut router, scheduler) = make_router();
    let log = Arc::new(Mutex::new(Vec::new()));
    router.bind(View::Play, ControlId::Cc(21), recorder(&log));

    assert_eq!(router.process(&[0x90, 7, 127]), Ok(RouteOutcome::Filtered));
    assert_eq!(router.process(&[0xB0, 21, 64]), Ok(RouteOutcome::Filtered));
    assert_eq!(router.process(&[0x80, 40, 0]), Ok(RouteOutcome::Filtered));

    assert!(!router.layer().is_shifted());
    assert_eq!(*router.layer().active_view(), View::Play);
    assert!(log.lock().is_empty());
    assert!(scheduler.targets().is_empty());
}

#[test]
fn test_any_channel_without_filter() {
    let scheduler = Arc::new(RecordingScheduler::default());
    let mut config = make_config();
    config.control_channel = None;
    let mut router = InputRouter::new(config, View::Play, scheduler);

    assert_eq!(router.process(&[0x9F, 7, 127]), Ok(RouteOutcome::ShiftPressed));
}

#[test]
fn test_invalid_shift_velocity_changes_nothing() {
    let (mut router, scheduler) = make_router();

    assert_eq!(
        router.process(&[0x92, 7, 64]),
        Err(RoutingError::ShiftVelocity(64))
    );
    assert!(!router.layer().is_shifted());
    assert_eq!(*router.layer().active_view(), View::Play);
    assert!(scheduler.targets().is_empty());
}

#[test]
fn test_pad_note_off_schedules_resync() {
    let (mut router, scheduler) = make_router();
    let log = Arc::new(Mutex::new(Vec::new()));
    router.bind_pads(View::Play, recorder(&log));

    router.process(&[0x92, 40, 100]).unwrap();
    assert!(scheduler.targets().is_empty(), "no resync on note-on");

    router.process(&[0x92, 40, 0]).unwrap();
    assert_eq!(scheduler.targets(), vec![ResyncTarget::Pad(40)]);

    let task = scheduler.tasks.lock()[0];
    assert!(task.fire_at > std::time::Instant::now() + Duration::from_millis(50));

    let events = log.lock().clone();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, EventKind::Press);
    assert_eq!(events[1].kind, EventKind::Release);
    assert_eq!(events[1].control, ControlId::Note(40));
}

#[test]
fn test_pad_handler_follows_active_view() {
    let (mut router, _) = make_router();
    let play = Arc::new(Mutex::new(Vec::new()));
    let shift = Arc::new(Mutex::new(Vec::new()));
    router.bind_pads(View::Play, recorder(&play));
    router.bind_pads(View::Shift, recorder(&shift));

    router.process(&[0x92, 36, 127]).unwrap();
    router.process(&[0x92, 7, 127]).unwrap();
    router.process(&[0x92, 37, 127]).unwrap();

    assert_eq!(play.lock().len(), 1);
    assert_eq!(shift.lock().len(), 1);
    assert_eq!(shift.lock()[0].control, ControlId::Note(37));
}

#[test]
fn test_unbound_control_is_reported() {
    let (mut router, _) = make_router();

    let err = router.process(&[0xB2, 99, 1]).unwrap_err();
    assert_eq!(
        err,
        RoutingError::UnknownControl {
            view: "Play".to_string(),
            control: "cc 99".to_string(),
        }
    );
}

#[test]
fn test_cc_dispatch_uses_active_view_binding() {
    let (mut router, _) = make_router();
    let play = Arc::new(Mutex::new(Vec::new()));
    let browse = Arc::new(Mutex::new(Vec::new()));
    router.bind(View::Play, ControlId::Cc(21), recorder(&play));
    router.bind(View::Browse, ControlId::Cc(21), recorder(&browse));

    router.process(&[0xB2, 21, 64]).unwrap();
    assert_eq!(play.lock()[0].kind, EventKind::Change);
    assert_eq!(play.lock()[0].value, 64);
    assert!(browse.lock().is_empty());
}

#[test]
fn test_malformed_and_unsupported_messages() {
    let (mut router, _) = make_router();

    assert_eq!(router.process(&[0x92, 7]), Err(RoutingError::Malformed(2)));
    assert_eq!(router.process(&[0xE2, 0, 64]), Err(RoutingError::Unsupported(0xE2)));
    assert_eq!(
        router.process(&[0xF0, 0x00, 0x20, 0x6B, 0xF7]),
        Ok(RouteOutcome::Ignored)
    );
    assert!(!router.layer().is_shifted());
}
