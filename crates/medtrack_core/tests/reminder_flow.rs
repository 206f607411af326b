use chrono::NaiveDate;
use medtrack_core::{
    Clock, CollectingSink, FixedClock, MedicationSchedule, MemoryDataRepository,
    NotificationSink, ReminderScheduler, TrackerService,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type SharedService = Arc<Mutex<TrackerService<MemoryDataRepository, Arc<FixedClock>>>>;

fn shared_service(clock: Arc<FixedClock>) -> SharedService {
    let mut service = TrackerService::open(MemoryDataRepository::new(), clock);
    let mut schedule = MedicationSchedule::with_id(
        "S1",
        "Metformin",
        ["08:00".parse().unwrap(), "20:00".parse().unwrap()],
    );
    schedule.start_date = NaiveDate::from_ymd_opt(2026, 1, 1);
    service.add_medication(schedule).unwrap();
    service.set_reminders_enabled(true).unwrap();
    Arc::new(Mutex::new(service))
}

#[test]
fn periodic_scans_deliver_each_dose_once() {
    let clock = Arc::new(FixedClock::new(
        NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(7, 55, 0)
            .unwrap(),
    ));
    let service = shared_service(Arc::clone(&clock));
    let sink = Arc::new(CollectingSink::new());

    let mut scheduler = ReminderScheduler::with_interval(Duration::from_millis(5));
    let scan_service = Arc::clone(&service);
    let scan_sink = Arc::clone(&sink);
    let reset_service = Arc::clone(&service);
    let timer_clock: Arc<dyn Clock> = clock;
    scheduler
        .enable(
            timer_clock,
            move || {
                let events = scan_service.lock().unwrap().scan_reminders();
                scan_sink.deliver_all(&events);
            },
            move || reset_service.lock().unwrap().reset_notified(),
        )
        .unwrap();

    std::thread::sleep(Duration::from_millis(60));
    scheduler.disable();

    let delivered = sink.take();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].key().as_str(), "2026-01-01|S1|08:00");
    assert_eq!(delivered[0].minutes_until_dose, 5);
}
