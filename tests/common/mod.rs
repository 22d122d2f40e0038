use chrono::{DateTime, TimeZone, Utc};
use segment_service::clock::{Clock, ManualClock, SystemClock};
use segment_service::db::create_test_connection_in_temporary_file;
use segment_service::SegmentService;
use std::sync::Arc;

/// Service on a fresh temporary database using the wall clock
/// Returns (service, _guard) - keep _guard alive to prevent temp file deletion
#[allow(dead_code)]
pub async fn create_test_service() -> (SegmentService, tempfile::TempDir) {
    create_test_service_with_clock(Arc::new(SystemClock)).await
}

#[allow(dead_code)]
pub async fn create_test_service_with_clock(
    clock: Arc<dyn Clock>,
) -> (SegmentService, tempfile::TempDir) {
    let (pool, guard) = create_test_connection_in_temporary_file().await.unwrap();
    let service = SegmentService::with_pool(pool, clock).await.unwrap();
    (service, guard)
}

/// Manual clock parked at the given UTC time
#[allow(dead_code)]
pub fn manual_clock(year: i32, month: u32, day: u32, hour: u32) -> Arc<ManualClock> {
    Arc::new(ManualClock::new(at(year, month, day, hour)))
}

#[allow(dead_code)]
pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
