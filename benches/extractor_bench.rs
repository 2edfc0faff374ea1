use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use focustube::intervals::{parse_iso8601_duration, SchedulerConfig, SchedulerCore, SimulatedPlayer};
use focustube::{extract_intervals, Interval, PlaybackWidget};

/// A description with `chapters` markers mixed with ordinary prose
fn sample_description(chapters: usize) -> String {
    let mut text = String::from("Full breakdown of the closed guard.\nLinks: https://example.com/12:30\n\n");
    for i in 0..chapters {
        let seconds = i * 45;
        text.push_str(&format!("{}:{:02} Chapter {} details\n", seconds / 60, seconds % 60, i + 1));
        text.push_str("Some commentary about grips and posture at 10:00am sharp\n");
    }
    text
}

/// Benchmark description parsing across description sizes
fn bench_extract_intervals(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_intervals");

    for chapters in [5, 50, 500] {
        let description = sample_description(chapters);
        let duration = Some((chapters * 45 + 60) as f64);

        group.bench_with_input(BenchmarkId::from_parameter(chapters), &description, |b, description| {
            b.iter(|| extract_intervals(black_box(description), black_box(duration)))
        });
    }

    group.finish();
}

/// Benchmark ISO-8601 duration parsing
fn bench_duration_parsing(c: &mut Criterion) {
    c.bench_function("parse_iso8601_duration", |b| {
        b.iter(|| parse_iso8601_duration(black_box("PT1H23M45S")))
    });
}

/// Benchmark a single scheduler decision against a ready player
fn bench_scheduler_tick(c: &mut Criterion) {
    let player = SimulatedPlayer::new(3600.0);
    player.mark_ready();

    let intervals = (0..100)
        .map(|i| Interval::new(i as f64 * 30.0, i as f64 * 30.0 + 20.0))
        .collect();
    let config = SchedulerConfig::new("bench", intervals, true);
    let mut core = SchedulerCore::new();

    c.bench_function("scheduler_tick", |b| {
        b.iter(|| {
            let _ = player.seek_to(black_box(1234.0));
            core.tick(&player, black_box(&config))
        })
    });
}

criterion_group!(benches, bench_extract_intervals, bench_duration_parsing, bench_scheduler_tick);
criterion_main!(benches);
