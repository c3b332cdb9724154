use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use retro_ntsc::{ConsoleVariant, NtscFilter, Preset, SetupOverrides};

/// Kernel compilation cost per preset; dominated by table entry count.
fn bench_kernel_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel_build");
    for preset in [
        Preset::Composite,
        Preset::SVideo,
        Preset::Rgb,
        Preset::Monochrome,
    ] {
        group.bench_with_input(
            BenchmarkId::new("nes", preset),
            &preset,
            |b, &preset| {
                let mut filter = NtscFilter::unconfigured(ConsoleVariant::Nes);
                b.iter(|| {
                    filter
                        .configure(Some(preset), &SetupOverrides::default())
                        .unwrap();
                    black_box(filter.is_configured())
                });
            },
        );
    }
    group.finish();
}

/// Per-frame rendering cost for each console variant.
fn bench_frame_blit(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_blit");
    for variant in [ConsoleVariant::Nes, ConsoleVariant::Snes, ConsoleVariant::Sms] {
        group.bench_with_input(
            BenchmarkId::from_parameter(variant),
            &variant,
            |b, &variant| {
                let mut filter = NtscFilter::new(variant);
                for (i, sample) in filter.input_mut().iter_mut().enumerate() {
                    *sample = i as u16;
                }
                b.iter(|| {
                    filter.process().unwrap();
                    black_box(filter.output()[0])
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_kernel_build, bench_frame_blit);
criterion_main!(benches);
