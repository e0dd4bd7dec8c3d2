use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Days, NaiveDate};
use studiobook::config::BookingPolicy;
use studiobook::engine::{Engine, NewService};
use studiobook::model::{BlockInput, BookingRequest};
use studiobook::notify::NotifyHub;
use studiobook::timeofday::minutes_to_time;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    if latencies.is_empty() {
        println!("  {label}: no samples");
        return;
    }
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}ms, p50={:.2}ms, p95={:.2}ms, p99={:.2}ms, max={:.2}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies[latencies.len() - 1].as_secs_f64() * 1000.0,
    );
}

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 7).expect("valid date")
}

fn request(service_id: &str, date: NaiveDate, start: i32) -> BookingRequest {
    BookingRequest {
        client_name: "Bench Client".into(),
        client_phone: "+1 555 0100".into(),
        service_id: service_id.to_string(),
        date: date.format("%Y-%m-%d").to_string(),
        start_time: minutes_to_time(start),
        ..Default::default()
    }
}

async fn setup() -> (Arc<Engine>, String) {
    let dir = std::env::temp_dir().join("studiobook_bench");
    std::fs::create_dir_all(&dir).expect("create bench dir");
    let path = dir.join(format!("bench_{}.wal", ulid::Ulid::new()));
    let engine = Engine::new(path, Arc::new(NotifyHub::new()), BookingPolicy::default())
        .expect("open engine");
    let service = engine
        .create_service(NewService {
            name: "Gel manicure".into(),
            duration_minutes: 60,
            ..Default::default()
        })
        .await
        .expect("create service");
    for weekday in 0..7 {
        engine
            .set_schedule_day(weekday, &[BlockInput::new("08:00", "20:00")])
            .await
            .expect("set schedule");
    }
    println!("  service {} with 08:00-20:00 every day", service.id);
    (Arc::new(engine), service.id.to_string())
}

/// One booking at a time, each on a fresh hour.
async fn phase1_sequential(engine: &Engine, service_id: &str) {
    let n = 2_000;
    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();
    for i in 0..n {
        let date = base_date() + Days::new((i / 12) as u64);
        let slot = 8 * 60 + (i % 12) as i32 * 60;
        let t = Instant::now();
        engine
            .request_booking(request(service_id, date, slot))
            .await
            .expect("sequential booking");
        latencies.push(t.elapsed());
    }
    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} bookings in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("booking latency", &mut latencies);
}

/// Many clients race for the same slots; exactly one per slot may win.
async fn phase2_contention(engine: &Arc<Engine>, service_id: &str) {
    let clients = 64;
    let slots = 12;
    let date = base_date() + Days::new(1_000);
    let won = Arc::new(AtomicUsize::new(0));
    let lost = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();
    let mut handles = Vec::new();
    for c in 0..clients {
        let engine = engine.clone();
        let service_id = service_id.to_string();
        let won = won.clone();
        let lost = lost.clone();
        handles.push(tokio::spawn(async move {
            for s in 0..slots {
                let slot = 8 * 60 + ((s + c) % slots) as i32 * 60;
                match engine.request_booking(request(&service_id, date, slot)).await {
                    Ok(_) => won.fetch_add(1, Ordering::Relaxed),
                    Err(_) => lost.fetch_add(1, Ordering::Relaxed),
                };
            }
        }));
    }
    for h in handles {
        let _ = h.await;
    }
    let won = won.load(Ordering::Relaxed);
    println!(
        "  {clients} clients x {slots} slots in {:.2}s: {won} booked, {} refused",
        start.elapsed().as_secs_f64(),
        lost.load(Ordering::Relaxed)
    );
    assert_eq!(won, slots, "double booking detected");
}

/// Availability reads on one day while writers fill the following days.
async fn phase3_reads_under_load(engine: &Arc<Engine>, service_id: &str) {
    let read_date = base_date() + Days::new(2_000);
    let writer = {
        let engine = engine.clone();
        let service_id = service_id.to_string();
        tokio::spawn(async move {
            for i in 0..1_200 {
                let date = read_date + Days::new(1 + (i / 12) as u64);
                let slot = 8 * 60 + (i % 12) as i32 * 60;
                let _ = engine.request_booking(request(&service_id, date, slot)).await;
            }
        })
    };
    let date = read_date.format("%Y-%m-%d").to_string();
    let mut latencies = Vec::new();
    while !writer.is_finished() {
        let t = Instant::now();
        let _ = engine.compute_availability(&date, service_id).await;
        latencies.push(t.elapsed());
    }
    let _ = writer.await;
    print_latency("availability latency", &mut latencies);
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    println!("=== studiobook stress benchmark ===\n");

    println!("[setup]");
    let (engine, service_id) = setup().await;

    println!("\n[phase 1] sequential booking throughput");
    phase1_sequential(&engine, &service_id).await;

    println!("\n[phase 2] contended slots");
    phase2_contention(&engine, &service_id).await;

    println!("\n[phase 3] availability latency under write load");
    phase3_reads_under_load(&engine, &service_id).await;

    println!("\n[phase 4] compaction");
    let t = Instant::now();
    engine.compact_wal().await.expect("compact");
    println!("  compacted in {:.2}ms", t.elapsed().as_secs_f64() * 1000.0);

    println!("\n=== benchmark complete ===");
}
